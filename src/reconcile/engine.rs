//! 对账引擎：把入站事件逐条落到 transcript
//!
//! 规则：
//! - 首次出现的 id 新建条目，之后同 id 的事件原地更新（内容整体替换，不追加）
//! - 侧栏内容以最新事件为准整体替换；流式期间内联显示，终止时一次性切换为可折叠
//! - `is_streaming == false` 是唯一能结束条目流式状态、释放 in-flight 守卫的信号
//! - 没有序号概念：同一 id 的乱序事件以最后处理的为准

use crate::protocol::InboundEvent;
use crate::reconcile::ChatView;
use crate::session::ChatContext;
use crate::transcript::{Role, Upserted};

/// 一次成功对账的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub id: String,
    pub created: bool,
    pub terminal: bool,
}

#[derive(Debug, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self
    }

    /// 应用一条入站事件；无法对账（既无 id 也无 message）时丢弃并返回 None
    pub fn apply(
        &self,
        ctx: &mut ChatContext,
        event: InboundEvent,
        view: &mut dyn ChatView,
    ) -> Option<Reconciled> {
        if !event.is_resolvable() {
            tracing::warn!("dropping inbound event without id or message");
            return None;
        }

        let terminal = event.is_terminal();
        let InboundEvent {
            id,
            message,
            is_user,
            side_content,
            ..
        } = event;
        let id = id.unwrap_or_else(|| ctx.ids.next("msg"));
        // 用户消息不带侧栏
        let side_content = side_content.filter(|_| !is_user);

        let Upserted { entry, created } =
            ctx.transcript.upsert(&id, Role::from_is_user(is_user));

        if created {
            entry.content = message.unwrap_or_default();
            if let Some(side) = side_content {
                entry.side_panel = Some(side);
                entry.side_panel_visible = !terminal;
            }
        } else {
            // 整体替换，不追加
            if let Some(text) = message {
                entry.content = text;
            }
            if let Some(side) = side_content {
                // 完成态保留用户的展开 / 收起选择
                if !entry.side_panel_toggle {
                    entry.side_panel_visible = true;
                }
                entry.side_panel = Some(side);
            }
        }

        let mut panel_finalized = false;
        if terminal {
            panel_finalized = ctx.transcript.finalize_side_panel(&id);
            ctx.transcript.set_streaming(&id, false);
        }

        if let Some(entry) = ctx.transcript.get(&id) {
            if created {
                view.on_entry_created(entry);
            } else {
                view.on_entry_updated(entry);
            }
            if panel_finalized {
                view.on_side_panel_finalized(entry);
            }
        }

        if terminal {
            ctx.finish_request(view);
        }

        tracing::debug!(id = %id, created, terminal, "reconciled inbound event");

        Some(Reconciled {
            id,
            created,
            terminal,
        })
    }
}
