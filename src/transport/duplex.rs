//! WebSocket 双工通道
//!
//! 后台任务维护 Connecting -> Open -> Closed 状态机：断开（或连接失败）后固定延迟重连，
//! 不做退避、不设上限，直到会话的 CancellationToken 触发。
//! 每个文本帧解码为 InboundEvent 后按到达顺序送入入站通道；畸形帧记录日志后丢弃。

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::{ConnectionState, DuplexLink};
use crate::core::ChatError;
use crate::protocol::{decode_event, InboundEvent, OutboundRequest};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 双工通道配置；spawn 后由后台任务持有
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
    reconnect_delay: Duration,
}

/// 会话侧句柄：查询状态、发送出站请求
#[derive(Debug, Clone)]
pub struct DuplexHandle {
    state_rx: watch::Receiver<ConnectionState>,
    outbound_tx: mpsc::UnboundedSender<String>,
}

enum PumpExit {
    /// 连接断开，需要重连
    Disconnected,
    /// 会话关闭或入站消费者已退出
    Stopped,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 启动后台连接循环，返回句柄与入站事件通道（跨重连持续有效）
    pub fn spawn(
        self,
        shutdown: CancellationToken,
    ) -> (DuplexHandle, mpsc::UnboundedReceiver<InboundEvent>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(self.run(state_tx, outbound_rx, inbound_tx, shutdown));

        (
            DuplexHandle {
                state_rx,
                outbound_tx,
            },
            inbound_rx,
        )
    }

    async fn run(
        self,
        state_tx: watch::Sender<ConnectionState>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        inbound_tx: mpsc::UnboundedSender<InboundEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            let _ = state_tx.send(ConnectionState::Connecting);
            tracing::debug!(url = %self.url, "connecting duplex channel");

            let connected = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((stream, _)) => {
                    // 断线前未发出的请求不补发
                    let mut stale = 0usize;
                    while outbound_rx.try_recv().is_ok() {
                        stale += 1;
                    }
                    if stale > 0 {
                        tracing::warn!(stale, "discarding payloads queued before reconnect");
                    }

                    let _ = state_tx.send(ConnectionState::Open);
                    tracing::info!(url = %self.url, "duplex channel open");

                    match pump(stream, &mut outbound_rx, &inbound_tx, &shutdown).await {
                        PumpExit::Disconnected => {
                            tracing::info!("duplex channel closed");
                        }
                        PumpExit::Stopped => break,
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, "duplex connect failed: {}", e);
                }
            }

            let _ = state_tx.send(ConnectionState::Closed);
            tracing::info!(
                "reconnecting in {}s",
                self.reconnect_delay.as_secs_f32()
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        let _ = state_tx.send(ConnectionState::Closed);
        tracing::debug!("duplex loop stopped");
    }
}

/// 单个连接的收发循环
async fn pump(
    stream: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    inbound_tx: &mpsc::UnboundedSender<InboundEvent>,
    shutdown: &CancellationToken,
) -> PumpExit {
    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = ws_tx.close().await;
                return PumpExit::Stopped;
            }
            Some(payload) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(WsMessage::Text(payload)).await {
                    tracing::warn!("duplex send failed: {}", e);
                    return PumpExit::Disconnected;
                }
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match decode_event(&text) {
                    Ok(event) => {
                        if inbound_tx.send(event).is_err() {
                            return PumpExit::Stopped;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("dropping malformed inbound payload: {}", e);
                    }
                },
                Some(Ok(WsMessage::Close(_))) | None => return PumpExit::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("duplex receive error: {}", e);
                    return PumpExit::Disconnected;
                }
            },
        }
    }
}

impl DuplexHandle {
    /// 订阅连接状态变化
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

impl DuplexLink for DuplexHandle {
    fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    fn send(&self, request: &OutboundRequest) -> Result<(), ChatError> {
        if self.state() != ConnectionState::Open {
            return Err(ChatError::NotConnected);
        }
        let payload = request.to_json()?;
        self.outbound_tx
            .send(payload)
            .map_err(|_| ChatError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    async fn wait_for_state(
        rx: &mut watch::Receiver<ConnectionState>,
        wanted: ConnectionState,
    ) {
        timeout(Duration::from_secs(5), async {
            while *rx.borrow_and_update() != wanted {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("state not reached");
    }

    #[tokio::test]
    async fn test_send_rejected_when_not_open() {
        let shutdown = CancellationToken::new();
        // 没有服务端监听的端口：连接失败，状态在 Connecting / Closed 之间循环
        let transport =
            WebSocketTransport::new("ws://127.0.0.1:9/ws/chat", Duration::from_millis(50));
        let (handle, _inbound) = transport.spawn(shutdown.clone());
        let err = handle
            .send(&OutboundRequest::new("hi", false))
            .unwrap_err();
        assert!(matches!(err, ChatError::NotConnected));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_roundtrip_drops_malformed_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            // 第一个连接：推送一条畸形帧和一条合法事件，读取客户端请求后关闭
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(WsMessage::Text("{not json".into())).await.unwrap();
            ws.send(WsMessage::Text(
                r#"{"id":"r1","message":"hello","is_user":false,"is_streaming":false}"#.into(),
            ))
            .await
            .unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if let WsMessage::Text(text) = msg {
                    let _ = seen_tx.send(text);
                    break;
                }
            }
            let _ = ws.close(None).await;
            // 第二个连接：证明发生了重连
            let (stream, _) = listener.accept().await.unwrap();
            let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let shutdown = CancellationToken::new();
        let transport =
            WebSocketTransport::new(format!("ws://{}/ws/chat", addr), Duration::from_millis(50));
        let (handle, mut inbound) = transport.spawn(shutdown.clone());
        let mut state = handle.subscribe();

        wait_for_state(&mut state, ConnectionState::Open).await;

        let event = timeout(Duration::from_secs(5), inbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.id.as_deref(), Some("r1"));
        assert!(event.is_terminal());

        handle.send(&OutboundRequest::new("hi", true)).unwrap();
        let sent = timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(value["message"], "hi");
        assert_eq!(value["resume"], true);

        wait_for_state(&mut state, ConnectionState::Closed).await;
        wait_for_state(&mut state, ConnectionState::Open).await;

        shutdown.cancel();
    }
}
