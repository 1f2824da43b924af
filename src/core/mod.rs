//! 核心编排层：错误类型、UI 状态投影、会话 actor

pub mod error;
pub mod orchestrator;
pub mod state;

pub use error::ChatError;
pub use orchestrator::{create_session, spawn_session, Command};
pub use state::UiState;
