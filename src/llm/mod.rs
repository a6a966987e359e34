//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod structured;
pub mod traits;

pub use mock::MockChatClient;
pub use openai::OpenAiClient;
pub use structured::{complete_structured, extract_json};
pub use traits::{ChatClient, ChatMessage, LlmError, Role};
