//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 ChatClient：complete（非流式文本补全）。
//! 结构化输出（JSON 约束）见 structured 模块。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 单条生成消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// LLM 调用错误（网络 / 超时 / 空补全 / 结构化输出不合法）
///
/// 对重试策略而言四类一视同仁：都算一次失败的尝试。
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("empty completion")]
    EmptyCompletion,

    #[error("malformed structured output: {0}")]
    Malformed(String),
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}
