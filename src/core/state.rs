//! UI 投影状态
//!
//! 会话 actor 独占 ChatContext，每处理完一条输入后把需要渲染的部分投影成 UiState，经 watch 通道发给 UI。

use serde::Serialize;

use crate::session::ChatContext;
use crate::transcript::MessageEntry;
use crate::transport::ConnectionState;

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub entries: Vec<MessageEntry>,
    /// 请求在途时输入被锁定
    pub input_locked: bool,
    pub loading: bool,
    pub connection: ConnectionState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            input_locked: false,
            loading: false,
            connection: ConnectionState::Connecting,
        }
    }
}

impl UiState {
    pub fn project(ctx: &ChatContext, connection: ConnectionState) -> Self {
        Self {
            entries: ctx.transcript.entries().to_vec(),
            input_locked: ctx.in_flight,
            loading: ctx.loading,
            connection,
        }
    }

    /// 最近一个可切换侧栏的条目
    pub fn last_toggleable(&self) -> Option<&MessageEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.can_toggle_side_panel())
    }
}
