//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将用户输入与快捷键转为 Command 发送给会话，
//! 每帧用 draw 渲染 UiState 与输入缓冲。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, UiState};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::markdown::MarkdownRenderer;
use crate::ui::render::draw;

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    mut state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    renderer: &dyn MarkdownRenderer,
    max_display_chars: usize,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(
        &mut terminal,
        &mut state_rx,
        EventHandler::new(cmd_tx),
        renderer,
        max_display_chars,
    )
    .await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: &mut watch::Receiver<UiState>,
    event_handler: EventHandler,
    renderer: &dyn MarkdownRenderer,
    max_display_chars: usize,
) -> anyhow::Result<()> {
    let mut input_buffer = String::new();
    let mut conversation_scroll = 0usize;
    let mut last_entry_count = 0usize;

    loop {
        let state = state_rx.borrow_and_update().clone();

        // 新条目追加时滚到底部
        if state.entries.len() != last_entry_count {
            last_entry_count = state.entries.len();
            conversation_scroll = usize::MAX;
        }

        if let Some(ev) = event_handler.poll()? {
            match ev {
                AppEvent::Quit => {
                    event_handler.send_quit();
                    break;
                }
                AppEvent::Submit => {
                    event_handler.submit_input(&mut input_buffer).await;
                }
                AppEvent::Newline => input_buffer.push('\n'),
                AppEvent::ToggleSidePanel => {
                    if let Some(entry) = state.last_toggleable() {
                        event_handler.send_toggle(entry.id.clone());
                    }
                }
                AppEvent::Key(key) => match key.code {
                    KeyCode::Backspace => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) => input_buffer.push(c),
                    KeyCode::Up => conversation_scroll = conversation_scroll.saturating_sub(1),
                    KeyCode::Down => conversation_scroll = conversation_scroll.saturating_add(1),
                    KeyCode::PageUp => conversation_scroll = conversation_scroll.saturating_sub(10),
                    KeyCode::PageDown => {
                        conversation_scroll = conversation_scroll.saturating_add(10)
                    }
                    KeyCode::Home => conversation_scroll = 0,
                    KeyCode::End => conversation_scroll = usize::MAX,
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| {
            draw(
                f,
                &state,
                &input_buffer,
                renderer,
                max_display_chars,
                conversation_scroll,
                &mut scroll_info,
            );
        })?;
        let (total_lines, viewport_height) = scroll_info;
        let max_scroll = total_lines.saturating_sub(viewport_height);
        conversation_scroll = conversation_scroll.min(max_scroll);

        tokio::task::yield_now().await;
    }

    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
