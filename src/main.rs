//! Myrdal Chat - 流式对话终端客户端
//!
//! 入口：加载配置、初始化日志、创建会话与 TUI，并运行主循环。

use std::path::PathBuf;

use anyhow::Context;
use myrdal_chat::{
    config::{load_config, AppConfig},
    core::{create_session, Command},
    observability,
    ui::{run_app, TerminalMarkdown},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 可选参数：配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let (cfg, load_error) = match load_config(config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    observability::init(&cfg.log).context("Failed to initialize logging")?;
    if let Some(e) = load_error {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }

    // 创建会话：返回命令发送端、状态接收端
    let (cmd_tx, state_rx) = create_session(&cfg)
        .await
        .context("Failed to create chat session")?;

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送用户指令）
    let result = run_app(
        state_rx,
        cmd_tx.clone(),
        &TerminalMarkdown,
        cfg.ui.max_display_chars,
    )
    .await
    .context("App run failed");

    let _ = cmd_tx.send(Command::Quit);
    result
}
