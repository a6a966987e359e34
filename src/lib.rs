//! Anna - 模拟心理障碍患者对话引擎
//!
//! 模拟一位在多轮咨访对话中逐步暴露主诉、情绪随之起伏的心理障碍患者。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **engine**: 单轮编排核心（主诉推进、情绪调制、知识检索、韧性生成）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: tracing 初始化
//! - **session**: 会话状态与进程内存储

pub mod config;
pub mod engine;
pub mod llm;
pub mod observability;
pub mod session;

pub use engine::{MsPatient, TurnResult};
pub use session::SessionState;
