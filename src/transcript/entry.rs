//! 对话条目
//!
//! 一条 MessageEntry 对应 transcript 中的一个位置；流式回复在同一个 id 上反复更新。

use serde::Serialize;

use crate::protocol::SideContent;

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn from_is_user(is_user: bool) -> Self {
        if is_user {
            Role::User
        } else {
            Role::Assistant
        }
    }

    /// 由入站事件隐式创建时的默认 streaming：助手条目仍在输出，用户条目已完成
    pub fn default_streaming(self) -> bool {
        matches!(self, Role::Assistant)
    }
}

/// 单条对话条目
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageEntry {
    pub id: String,
    pub role: Role,
    /// Markdown 源文本（渲染前）
    pub content: String,
    pub streaming: bool,
    /// 思考 / 熟考步骤；首个带侧栏内容的事件之前为 None
    pub side_panel: Option<SideContent>,
    pub side_panel_visible: bool,
    /// 侧栏已切换为「完成态」（出现折叠开关，默认收起）
    pub side_panel_toggle: bool,
}

impl MessageEntry {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            content: String::new(),
            streaming: role.default_streaming(),
            side_panel: None,
            side_panel_visible: false,
            side_panel_toggle: false,
        }
    }

    /// 本地回显的用户消息
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::new(id, Role::User)
        }
    }

    /// 一次性的助手通知（如降级失败提示），没有后续生命周期
    pub fn notice(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            streaming: false,
            ..Self::new(id, Role::Assistant)
        }
    }

    pub fn has_side_panel(&self) -> bool {
        self.side_panel.as_ref().is_some_and(|side| !side.is_empty())
    }

    /// 用户可切换侧栏（仅完成态）
    pub fn can_toggle_side_panel(&self) -> bool {
        self.side_panel_toggle && self.has_side_panel()
    }
}
