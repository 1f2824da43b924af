//! Myrdal Chat - 流式对话终端客户端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、UI 状态投影、会话 actor
//! - **observability**: tracing 日志初始化
//! - **protocol**: 线上消息格式（出站请求、入站事件、健康检查）
//! - **reconcile**: 把入站事件对账到 transcript 的引擎与视图回调
//! - **session**: 会话上下文、提交控制与 id 生成
//! - **transcript**: 有序、按 id 去重的对话记录
//! - **transport**: WebSocket 双工通道（自动重连）与 HTTP 降级
//! - **ui**: Ratatui TUI 界面

pub mod config;
pub mod core;
pub mod observability;
pub mod protocol;
pub mod reconcile;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod ui;
