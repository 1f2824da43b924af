//! 事件处理
//!
//! 轮询 crossterm 键盘事件并映射为 AppEvent；Enter 提交、Alt/Shift+Enter 换行、Ctrl+T 切换侧栏、
//! Esc/Ctrl+Q/Ctrl+C 退出，其余按键交给 run_app 编辑 input_buffer 或滚动。
//! 是否受理提交由会话决定，input_buffer 只在会话确认后清空。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;

/// 应用事件：快捷键动作或原始 KeyEvent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    Submit,
    Newline,
    ToggleSidePanel,
    Key(KeyEvent),
}

/// 把按键映射为 AppEvent
pub fn map_key(key: KeyEvent) -> AppEvent {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => AppEvent::Quit,
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => AppEvent::Quit,
        KeyCode::Char('t') if ctrl => AppEvent::ToggleSidePanel,
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            AppEvent::Newline
        }
        KeyCode::Enter => AppEvent::Submit,
        _ => AppEvent::Key(key),
    }
}

/// 事件处理器：持有 cmd_tx，poll 时读键盘并返回 AppEvent，send_* 把动作转为 Command
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(map_key(key)));
                }
            }
        }
        Ok(None)
    }

    /// 提交输入框内容并等待会话答复；受理则清空，被拒绝（空白、请求在途、会话已退出）则保留
    pub async fn submit_input(&self, input_buffer: &mut String) -> bool {
        if input_buffer.trim().is_empty() {
            return false;
        }
        let (cmd, accepted) = Command::submit(input_buffer.clone());
        if self.cmd_tx.send(cmd).is_err() {
            return false;
        }
        let accepted = accepted.await.unwrap_or(false);
        if accepted {
            input_buffer.clear();
        }
        accepted
    }

    pub fn send_toggle(&self, id: String) {
        let _ = self.cmd_tx.send(Command::ToggleSidePanel(id));
    }

    pub fn send_quit(&self) {
        let _ = self.cmd_tx.send(Command::Quit);
    }
}
