//! 会话编排器：单一所有者的会话 actor
//!
//! 负责：按配置建立双工通道与 HTTP 降级、启动时做一次健康探测，
//! 并在后台任务中独占 ChatContext，依次消费用户命令、入站事件、降级结果与连接状态变化，
//! 每步之后把 UiState 投影到 watch 通道。两次对账永远不会并发执行。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::UiState;
use crate::protocol::InboundEvent;
use crate::reconcile::{ChatView, ReconciliationEngine};
use crate::session::{ChatContext, Dispatch, SubmissionController};
use crate::transcript::MessageEntry;
use crate::transport::{
    ConnectionState, DuplexLink, FallbackTransport, HttpFallback, WebSocketTransport,
};

/// 从 UI 发往会话的用户命令
#[derive(Debug)]
pub enum Command {
    /// 提交用户输入；会话经 accepted 回告是否受理，被拒绝时 UI 保留输入
    Submit {
        text: String,
        accepted: oneshot::Sender<bool>,
    },
    /// 切换指定条目的侧栏显示
    ToggleSidePanel(String),
    /// 退出：停止重连循环与会话任务
    Quit,
}

impl Command {
    pub fn submit(text: impl Into<String>) -> (Self, oneshot::Receiver<bool>) {
        let (accepted, rx) = oneshot::channel();
        (
            Command::Submit {
                text: text.into(),
                accepted,
            },
            rx,
        )
    }
}

/// 把视图回调折叠成「需要重新投影」标志
#[derive(Debug, Default)]
struct ProjectionView {
    dirty: bool,
}

impl ChatView for ProjectionView {
    fn on_entry_created(&mut self, entry: &MessageEntry) {
        tracing::debug!(id = %entry.id, "entry created");
        self.dirty = true;
    }

    fn on_entry_updated(&mut self, _entry: &MessageEntry) {
        self.dirty = true;
    }

    fn on_side_panel_finalized(&mut self, entry: &MessageEntry) {
        tracing::debug!(id = %entry.id, "side panel finalized");
        self.dirty = true;
    }

    fn on_loading_changed(&mut self, _loading: bool) {
        self.dirty = true;
    }
}

/// 按配置创建会话：返回命令发送端与 UI 状态接收端
pub async fn create_session(
    cfg: &AppConfig,
) -> anyhow::Result<(mpsc::UnboundedSender<Command>, watch::Receiver<UiState>)> {
    let shutdown = CancellationToken::new();

    let ws_url = cfg.server.ws_url();
    tracing::info!("Using duplex endpoint {}", ws_url);
    let transport = WebSocketTransport::new(
        ws_url,
        Duration::from_secs(cfg.transport.reconnect_delay_secs),
    );
    let (duplex, inbound_rx) = transport.spawn(shutdown.clone());
    let conn_rx = duplex.subscribe();

    let fallback = Arc::new(
        HttpFallback::new(
            cfg.server.chat_url(),
            cfg.server.health_url(),
            cfg.transport.request_timeout_secs,
        )
        .context("Failed to build fallback HTTP client")?,
    );

    {
        let fallback = Arc::clone(&fallback);
        tokio::spawn(async move {
            match fallback.health().await {
                Ok(health) if health.is_ok() => {
                    tracing::info!(initialized = health.initialized, "server healthy");
                }
                Ok(health) => {
                    tracing::warn!(status = %health.status, "server reported unhealthy status");
                }
                Err(e) => tracing::warn!("health check failed: {}", e),
            }
        });
    }

    Ok(spawn_session(
        Arc::new(duplex),
        conn_rx,
        inbound_rx,
        fallback,
        SubmissionController::new(cfg.ui.error_text.clone()),
        shutdown,
    ))
}

/// 启动会话 actor；传输层以 trait 注入，测试可使用假实现
pub fn spawn_session(
    link: Arc<dyn DuplexLink>,
    mut conn_rx: watch::Receiver<ConnectionState>,
    mut inbound_rx: mpsc::UnboundedReceiver<InboundEvent>,
    fallback: Arc<dyn FallbackTransport>,
    controller: SubmissionController,
    shutdown: CancellationToken,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(UiState::default());
    // 降级请求在独立任务中等待，完成后经此通道回到 actor
    let (fallback_tx, mut fallback_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let engine = ReconciliationEngine::new();
        let mut ctx = ChatContext::new();
        let mut connection = *conn_rx.borrow_and_update();
        let _ = state_tx.send(UiState::project(&ctx, connection));

        loop {
            let mut view = ProjectionView::default();

            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        Command::Submit { text, accepted } => {
                            let mut input = text;
                            let dispatch =
                                controller.submit(&mut ctx, &mut input, link.as_ref(), &mut view);
                            let _ = accepted.send(dispatch.is_some());
                            if let Some(Dispatch::Fallback(request)) = dispatch {
                                let fallback = Arc::clone(&fallback);
                                let tx = fallback_tx.clone();
                                tokio::spawn(async move {
                                    let result = fallback.request(&request).await;
                                    let _ = tx.send(result);
                                });
                            }
                        }
                        Command::ToggleSidePanel(id) => {
                            ctx.toggle_side_panel(&id, &mut view);
                        }
                        Command::Quit => break,
                    }
                }
                Some(event) = inbound_rx.recv() => {
                    engine.apply(&mut ctx, event, &mut view);
                }
                Some(result) = fallback_rx.recv() => {
                    controller.complete_fallback(&mut ctx, &engine, result, &mut view);
                }
                Ok(()) = conn_rx.changed() => {
                    connection = *conn_rx.borrow_and_update();
                    tracing::debug!(%connection, "connection state changed");
                    view.dirty = true;
                }
            }

            if view.dirty {
                let _ = state_tx.send(UiState::project(&ctx, connection));
            }
        }

        shutdown.cancel();
        tracing::info!("chat session stopped");
    });

    (cmd_tx, state_rx)
}
