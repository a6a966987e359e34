//! 韧性生成：限次重试 + 固定回退语池
//!
//! 这是面向上游补全服务不稳定（超时、空补全、限流）的唯一兜底边界：
//! generate 不会失败，也不会返回空串。

use std::sync::Arc;

use rand::Rng;

use crate::llm::{ChatClient, ChatMessage};

/// 默认尝试次数上限
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// 重试耗尽时的回退语池（与患者人设相称的通用语句）
pub const FALLBACK_UTTERANCES: [&str; 3] = [
    "最近工作确实很忙，压力挺大的...有时候晚上都睡不好觉。",
    "嗯...说实话最近状态不太好，工作上的事情让我挺焦虑的。",
    "我最近一直在想是不是该调整一下工作方式，感觉有点力不从心。",
];

/// 韧性生成器
pub struct ResilientGenerator {
    client: Arc<dyn ChatClient>,
    max_attempts: usize,
}

impl ResilientGenerator {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self::with_max_attempts(client, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(client: Arc<dyn ChatClient>, max_attempts: usize) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 生成回复：每次尝试要求至少一条去空白后非空的候选文本，
    /// 出错或为空则告警重试；尝试耗尽后从回退语池随机取一条。
    pub async fn generate(&self, context: &[ChatMessage], rng: &mut impl Rng) -> String {
        for attempt in 1..=self.max_attempts {
            match self.client.complete(context).await {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => {
                    tracing::warn!(attempt, "generation returned empty text");
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "generation attempt failed");
                }
            }
        }

        tracing::warn!(
            max_attempts = self.max_attempts,
            "generation attempts exhausted, using fallback utterance"
        );
        let pick = rng.gen_range(0..FALLBACK_UTTERANCES.len());
        FALLBACK_UTTERANCES[pick].to_string()
    }
}
