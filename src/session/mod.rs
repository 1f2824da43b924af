//! 会话层：上下文（transcript + 在途守卫）、id 生成、提交控制

mod context;
mod ids;
mod submission;

pub use context::ChatContext;
pub use ids::IdGenerator;
pub use submission::{Dispatch, SubmissionController, DEFAULT_ERROR_TEXT};
