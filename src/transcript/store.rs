//! Transcript 存储：按 id 键控、按插入顺序排列的条目集合
//!
//! 只追加，不删除，不重排；索引在插入时确定，之后的更新不会移动位置。

use std::collections::HashMap;

use crate::protocol::SideContent;
use crate::transcript::{MessageEntry, Role};

/// upsert 的结果：条目本身 + 是否为本次新建
pub struct Upserted<'a> {
    pub entry: &'a mut MessageEntry,
    pub created: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TranscriptStore {
    entries: Vec<MessageEntry>,
    index: HashMap<String, usize>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已知 id 返回已有条目；否则按角色默认状态新建并追加到末尾
    pub fn upsert(&mut self, id: &str, role: Role) -> Upserted<'_> {
        let existing = self.index.get(id).copied();
        let (pos, created) = match existing {
            Some(pos) => (pos, false),
            None => {
                let pos = self.append(MessageEntry::new(id, role));
                (pos, true)
            }
        };
        Upserted {
            entry: &mut self.entries[pos],
            created,
        }
    }

    /// 追加本地创建的条目（本地回显、错误提示）；id 已存在时不重复追加，返回 false
    pub fn push(&mut self, entry: MessageEntry) -> bool {
        if self.index.contains_key(&entry.id) {
            tracing::debug!(id = %entry.id, "entry already present, push ignored");
            return false;
        }
        self.append(entry);
        true
    }

    fn append(&mut self, entry: MessageEntry) -> usize {
        let pos = self.entries.len();
        self.index.insert(entry.id.clone(), pos);
        self.entries.push(entry);
        pos
    }

    pub fn get(&self, id: &str) -> Option<&MessageEntry> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut MessageEntry> {
        let pos = *self.index.get(id)?;
        self.entries.get_mut(pos)
    }

    fn mutate(&mut self, id: &str, op: &str, f: impl FnOnce(&mut MessageEntry)) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                f(entry);
                true
            }
            None => {
                tracing::debug!(id, op, "unknown entry id, mutation skipped");
                false
            }
        }
    }

    pub fn set_content(&mut self, id: &str, text: impl Into<String>) -> bool {
        let text = text.into();
        self.mutate(id, "set_content", |e| e.content = text)
    }

    /// 整体替换侧栏（不是追加）
    pub fn set_side_panel(&mut self, id: &str, side: SideContent) -> bool {
        self.mutate(id, "set_side_panel", |e| e.side_panel = Some(side))
    }

    /// streaming 只允许 true -> false；已结束的条目不会被重新置为 streaming
    pub fn set_streaming(&mut self, id: &str, streaming: bool) -> bool {
        self.mutate(id, "set_streaming", |e| {
            if streaming && !e.streaming {
                tracing::debug!(id = %e.id, "entry already finalized, streaming stays false");
                return;
            }
            e.streaming = streaming;
        })
    }

    pub fn set_side_panel_visible(&mut self, id: &str, visible: bool) -> bool {
        self.mutate(id, "set_side_panel_visible", |e| e.side_panel_visible = visible)
    }

    /// 侧栏切换为完成态（显示开关、默认收起）；只在首次且侧栏非空时生效
    pub fn finalize_side_panel(&mut self, id: &str) -> bool {
        let mut transitioned = false;
        self.mutate(id, "finalize_side_panel", |e| {
            if e.has_side_panel() && !e.side_panel_toggle {
                e.side_panel_toggle = true;
                e.side_panel_visible = false;
                transitioned = true;
            }
        });
        transitioned
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
