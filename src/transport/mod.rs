//! 传输层：WebSocket 双工通道（自动重连）+ HTTP 一次性降级请求
//!
//! 会话只依赖这里的两个 trait，测试中可用脚本化的假实现替换真实网络。

mod duplex;
mod fallback;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::ChatError;
use crate::protocol::{InboundEvent, OutboundRequest};

pub use duplex::{DuplexHandle, WebSocketTransport};
pub use fallback::HttpFallback;

/// 双工连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// 双工通道：只在 Open 时入队，其它状态返回 NotConnected，由调用方改走降级
pub trait DuplexLink: Send + Sync {
    fn state(&self) -> ConnectionState;

    fn send(&self, request: &OutboundRequest) -> Result<(), ChatError>;
}

/// 一次性请求 / 响应；响应被适配为 streaming = false 的单个入站事件
#[async_trait]
pub trait FallbackTransport: Send + Sync {
    async fn request(&self, request: &OutboundRequest) -> Result<InboundEvent, ChatError>;
}
