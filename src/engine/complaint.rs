//! 主诉认知变化链与阶段推进
//!
//! 链由初始化协作方生成（3–7 个阶段，stage 从 1 连续编号），会话内不可变。
//! 推进判定交给外部模型：先把原始输入重写成适合小模型的提示词，再要一个结构化裁决。
//! 判定失败时保持原位（fail-open）；游标一律钳制在链长之内。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llm::{complete_structured, ChatClient, ChatMessage, LlmError};
use crate::session::{render_transcript, Utterance};

/// 链为空或全部无效时替换进来的默认主诉
pub const DEFAULT_COMPLAINT: &str = "工作焦虑，失眠问题";

/// 单个主诉阶段
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintStage {
    pub stage: u32,
    pub content: String,
}

/// 主诉认知变化链：有序阶段序列，创建后不可变
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintChain {
    stages: Vec<ComplaintStage>,
}

impl ComplaintChain {
    /// 构建并整形：丢弃空内容阶段，按 stage 排序后重排为 1..=n；
    /// 结果为空时退化为单一默认阶段，而不是让会话创建失败。
    pub fn sanitize(stages: Vec<ComplaintStage>) -> Self {
        let mut stages: Vec<ComplaintStage> = stages
            .into_iter()
            .filter(|s| !s.content.trim().is_empty())
            .collect();
        stages.sort_by_key(|s| s.stage);
        for (i, stage) in stages.iter_mut().enumerate() {
            stage.stage = i as u32 + 1;
        }
        if stages.is_empty() {
            stages.push(ComplaintStage {
                stage: 1,
                content: DEFAULT_COMPLAINT.to_string(),
            });
        }
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[ComplaintStage] {
        &self.stages
    }

    /// 按 1 起始游标取阶段内容，越界一律钳制（绝不越界访问）
    pub fn content_at(&self, index: usize) -> &str {
        let idx = index.clamp(1, self.stages.len());
        &self.stages[idx - 1].content
    }

    /// 渲染为判定提示词用的阶段清单
    fn render(&self) -> String {
        self.stages
            .iter()
            .map(|s| format!("{}. {}", s.stage, s.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 进度游标：进行中（1 起始）或会话已终止
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    InProgress(usize),
    Terminated,
}

impl Progress {
    pub fn start() -> Self {
        Progress::InProgress(1)
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Progress::InProgress(i) => Some(*i),
            Progress::Terminated => None,
        }
    }
}

/// 判定模型的结构化裁决。end_of_conversation 缺省为 false，
/// 终止用显式字段表达，不与游标数值混用。
#[derive(Debug, Deserialize)]
struct StageJudgement {
    advance: bool,
    #[serde(default)]
    end_of_conversation: bool,
}

/// 主诉阶段推进器
pub struct ComplaintTracker {
    client: Arc<dyn ChatClient>,
}

impl ComplaintTracker {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// 推进游标：裁决通过则 +1（钳制在链长），终止信号转 Terminated，
    /// 判定失败保持原位并告警。
    pub async fn advance(
        &self,
        chain: &ComplaintChain,
        progress: Progress,
        conversation: &[Utterance],
    ) -> Progress {
        let Progress::InProgress(index) = progress else {
            return Progress::Terminated;
        };
        let index = index.clamp(1, chain.len());

        match self.judge(chain, index, conversation).await {
            Ok(judgement) if judgement.end_of_conversation => Progress::Terminated,
            Ok(judgement) if judgement.advance => {
                Progress::InProgress((index + 1).min(chain.len()))
            }
            Ok(_) => Progress::InProgress(index),
            Err(e) => {
                tracing::warn!(index, error = %e, "stage judgement failed, keeping cursor");
                Progress::InProgress(index)
            }
        }
    }

    /// 两段式判定：重写提示词 -> 结构化裁决
    async fn judge(
        &self,
        chain: &ComplaintChain,
        index: usize,
        conversation: &[Utterance],
    ) -> Result<StageJudgement, LlmError> {
        let dialogue_history = render_transcript(conversation);
        let rewrite_prompt = [
            ChatMessage::system(
                "你是提示词结构优化助手，负责将复杂原始输入信息（如对话历史、主诉变化链）\
                 重写成清晰、结构化、适合小模型理解的提示词。请避免Markdown和JSON混排，\
                 明确字段间语义，引导小模型完成任务。",
            ),
            ChatMessage::user(format!(
                "【任务目标】\n判断患者在当前阶段的主诉问题是否已经得到充分认知。\n\n\
                 【咨询对话历史】\n{dialogue_history}\n\n\
                 【主诉认知变化链（所有阶段）】\n{}\n\n\
                 【当前阶段内容】\n{}\n\n\
                 请重写为一段提示词，便于小模型理解结构与任务，清晰传达：\
                 对话背景、认知变化链、当前阶段内容、判断任务目标。",
                chain.render(),
                chain.content_at(index),
            )),
        ];
        let optimized_prompt = self.client.complete(&rewrite_prompt).await?;

        complete_structured(
            &*self.client,
            &[ChatMessage::user(format!(
                "{optimized_prompt}\n\n请只输出一个 JSON 对象：\
                 {{\"advance\": true|false, \"end_of_conversation\": true|false}}。\
                 认知充分则 advance 为 true；若对话已到自然终点则 end_of_conversation 为 true。"
            ))],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain3() -> ComplaintChain {
        ComplaintChain::sanitize(vec![
            ComplaintStage {
                stage: 1,
                content: "最近总是失眠".to_string(),
            },
            ComplaintStage {
                stage: 2,
                content: "失眠可能和工作压力有关".to_string(),
            },
            ComplaintStage {
                stage: 3,
                content: "需要正视压力的来源".to_string(),
            },
        ])
    }

    #[test]
    fn test_sanitize_empty_chain_uses_default_stage() {
        let chain = ComplaintChain::sanitize(vec![]);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.content_at(1), DEFAULT_COMPLAINT);
    }

    #[test]
    fn test_sanitize_drops_blank_and_renumbers() {
        let chain = ComplaintChain::sanitize(vec![
            ComplaintStage {
                stage: 5,
                content: "  ".to_string(),
            },
            ComplaintStage {
                stage: 9,
                content: "乙".to_string(),
            },
            ComplaintStage {
                stage: 2,
                content: "甲".to_string(),
            },
        ]);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.stages()[0].stage, 1);
        assert_eq!(chain.content_at(1), "甲");
        assert_eq!(chain.content_at(2), "乙");
    }

    #[test]
    fn test_content_at_clamps_both_ends() {
        let chain = chain3();
        assert_eq!(chain.content_at(0), chain.content_at(1));
        assert_eq!(chain.content_at(99), chain.content_at(3));
    }

    #[test]
    fn test_progress_start_and_index() {
        assert_eq!(Progress::start().index(), Some(1));
        assert_eq!(Progress::Terminated.index(), None);
    }

    #[test]
    fn test_judgement_sentinel_defaults_false() {
        let j: StageJudgement = serde_json::from_str(r#"{"advance": true}"#).unwrap();
        assert!(j.advance);
        assert!(!j.end_of_conversation);
    }
}
