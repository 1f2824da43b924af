//! Transcript：有序、按 id 键控的对话条目

mod entry;
mod store;

pub use entry::{MessageEntry, Role};
pub use store::{TranscriptStore, Upserted};
