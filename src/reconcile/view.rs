//! 视图能力：对账引擎通过它通知外部渲染层，而不直接操作界面
//!
//! 所有方法都有空默认实现，测试可以只关心其中一部分回调。

use crate::transcript::MessageEntry;

pub trait ChatView {
    /// 新条目追加到 transcript 末尾
    fn on_entry_created(&mut self, _entry: &MessageEntry) {}

    /// 已有条目内容 / 侧栏 / 流式状态变化
    fn on_entry_updated(&mut self, _entry: &MessageEntry) {}

    /// 侧栏从内联显示切换为「可折叠、默认收起」（每个 id 仅一次）
    fn on_side_panel_finalized(&mut self, _entry: &MessageEntry) {}

    /// 加载提示显示 / 隐藏
    fn on_loading_changed(&mut self, _loading: bool) {}
}

/// 丢弃所有回调
#[derive(Debug, Default)]
pub struct NullView;

impl ChatView for NullView {}

/// 记录回调顺序，供测试断言
#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Created(String),
    Updated(String),
    SidePanelFinalized(String),
    Loading(bool),
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, wanted: &ViewEvent) -> usize {
        self.events.iter().filter(|e| *e == wanted).count()
    }
}

impl ChatView for RecordingView {
    fn on_entry_created(&mut self, entry: &MessageEntry) {
        self.events.push(ViewEvent::Created(entry.id.clone()));
    }

    fn on_entry_updated(&mut self, entry: &MessageEntry) {
        self.events.push(ViewEvent::Updated(entry.id.clone()));
    }

    fn on_side_panel_finalized(&mut self, entry: &MessageEntry) {
        self.events.push(ViewEvent::SidePanelFinalized(entry.id.clone()));
    }

    fn on_loading_changed(&mut self, loading: bool) {
        self.events.push(ViewEvent::Loading(loading));
    }
}
