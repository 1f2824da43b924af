//! 对账层：入站事件 -> transcript 变更，渲染通过 ChatView 注入

mod engine;
mod view;

pub use engine::{Reconciled, ReconciliationEngine};
pub use view::{ChatView, NullView, RecordingView, ViewEvent};
