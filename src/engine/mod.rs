//! 单轮编排核心
//!
//! - **complaint**: 主诉认知变化链与阶段推进
//! - **context**: 生成上下文装配
//! - **emotion**: 情绪推理与类距加权扰动
//! - **error**: 单轮错误分类
//! - **generator**: 韧性生成（限次重试 + 回退语池）
//! - **knowledge**: 前疗程知识判定与检索
//! - **orchestrator**: MsPatient 单轮状态机

pub mod complaint;
pub mod context;
pub mod emotion;
pub mod error;
pub mod generator;
pub mod knowledge;
pub mod orchestrator;

pub use complaint::{
    ComplaintChain, ComplaintStage, ComplaintTracker, Progress, DEFAULT_COMPLAINT,
};
pub use emotion::{
    apply_perturbation, perturb, perturb_weights, EmotionLabel, EmotionModulator, SentimentClass,
    PERTURB_THRESHOLD,
};
pub use error::TurnError;
pub use generator::{ResilientGenerator, FALLBACK_UTTERANCES};
pub use knowledge::KnowledgeRetriever;
pub use orchestrator::{
    create_clients_from_config, EngineClients, MsPatient, TurnResult, END_OF_CONVERSATION,
    NEUTRAL_FALLBACK,
};
