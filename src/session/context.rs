//! 会话上下文：一个聊天窗口实例的全部可变状态
//!
//! transcript、in-flight 标志、加载提示与 id 生成器都归同一个 ChatContext 所有，
//! 由会话 actor 独占访问，不存在全局状态。

use crate::reconcile::ChatView;
use crate::session::IdGenerator;
use crate::transcript::TranscriptStore;

#[derive(Debug, Default)]
pub struct ChatContext {
    pub transcript: TranscriptStore,
    /// 已提交、尚未收到终止事件（或降级失败）的请求
    pub in_flight: bool,
    pub loading: bool,
    pub ids: IdGenerator,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_request(&mut self, view: &mut dyn ChatView) {
        self.in_flight = true;
        self.set_loading(true, view);
    }

    /// 释放 in-flight 守卫并隐藏加载提示
    pub fn finish_request(&mut self, view: &mut dyn ChatView) {
        self.in_flight = false;
        self.set_loading(false, view);
    }

    fn set_loading(&mut self, loading: bool, view: &mut dyn ChatView) {
        if self.loading != loading {
            self.loading = loading;
            view.on_loading_changed(loading);
        }
    }

    /// 切换侧栏显示；流式期间侧栏内联显示、没有开关，返回 false
    pub fn toggle_side_panel(&mut self, id: &str, view: &mut dyn ChatView) -> bool {
        let visible = match self.transcript.get(id) {
            Some(entry) if entry.can_toggle_side_panel() => !entry.side_panel_visible,
            _ => return false,
        };
        self.transcript.set_side_panel_visible(id, visible);
        if let Some(entry) = self.transcript.get(id) {
            view.on_entry_updated(entry);
        }
        true
    }
}
