//! 会话层：状态容器与进程内存储

pub mod state;
pub mod store;

pub use state::{
    render_transcript, Portrait, Report, SessionState, Speaker, TurnRecord, Utterance,
};
pub use store::{SessionStatus, SessionStore, SessionSummary};
