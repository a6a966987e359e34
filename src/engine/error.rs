//! 单轮处理的错误分类
//!
//! 这些错误从不穿透 process_turn：编排器显式匹配 Result，
//! 失败的回合以中性回退语完整收尾。

use thiserror::Error;

use crate::llm::LlmError;

/// 单轮内部可失败步骤的错误（主诉推进 fail-open、生成自带兜底，均不在此列）
#[derive(Error, Debug)]
pub enum TurnError {
    /// 情绪推理失败（分类器出错或输出不合法）
    #[error("emotion inference failed: {0}")]
    Emotion(LlmError),

    /// 前疗程知识判定或检索失败
    #[error("knowledge retrieval failed: {0}")]
    Knowledge(LlmError),
}
