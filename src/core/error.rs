//! 客户端错误类型
//!
//! 所有失败都在发生处就地处理：畸形事件丢弃、双工断开重连、降级失败追加一条错误消息。
//! ChatError 只用于在各层之间传递「发生了什么」，不会向 UI 层冒泡成 panic。

use thiserror::Error;

/// 聊天客户端运行过程中可能出现的错误（解析、网络、WebSocket、配置等）
#[derive(Error, Debug)]
pub enum ChatError {
    /// 既没有 id 也没有 message 等无法对账的事件
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// 双工通道未处于 Open 状态，调用方应改走降级请求
    #[error("Duplex channel not open")]
    NotConnected,

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}
