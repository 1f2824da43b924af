//! 界面渲染
//!
//! 根据 UiState（entries、connection、loading）与 input_buffer 绘制：标题栏显示连接状态与处理中标记，
//! 主体为对话记录（按角色着色、助手消息经 Markdown 渲染、侧栏内联或折叠），底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::core::UiState;
use crate::protocol::{SideContent, SideContentKind};
use crate::transcript::{MessageEntry, Role};
use crate::transport::ConnectionState;
use crate::ui::markdown::MarkdownRenderer;

/// 流式输出中的光标
const STREAM_CURSOR: &str = "▌";
const SIDE_PANEL_COLLAPSED: &str = "🧠 展开思考过程";
const SIDE_PANEL_EXPANDED: &str = "🧠 隐藏思考过程";

/// 对过长内容做折叠：保留前 N 字 + 省略提示
fn truncate_for_display(content: &str, limit: usize) -> String {
    let total = content.chars().count();
    if limit == 0 || total <= limit {
        return content.to_string();
    }
    let head: String = content.chars().take(limit).collect();
    format!("{}\n... [内容已省略，共 {} 字]", head, total)
}

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

/// Paragraph 的滚动偏移只有 u16，超长记录截在上限而不是回绕
fn paragraph_scroll(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "连接中…",
        ConnectionState::Open => "已连接",
        ConnectionState::Closed => "已断开（HTTP 降级）",
    }
}

/// 侧栏步骤：thoughts 以 "Thought:" 开头整体显示，deliberations 逐步编号
fn side_panel_lines(side: &SideContent) -> Vec<String> {
    match side.kind {
        SideContentKind::Thoughts => std::iter::once("Thought:".to_string())
            .chain(side.steps.iter().cloned())
            .collect(),
        SideContentKind::Deliberations => side
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("Step {}: {}", i + 1, step))
            .collect(),
    }
}

/// 单条条目的正文行（未加前缀）
fn body_lines(entry: &MessageEntry, renderer: &dyn MarkdownRenderer, max_chars: usize) -> Vec<String> {
    let text = truncate_for_display(&entry.content, max_chars);
    let mut lines = match entry.role {
        Role::User => text.split('\n').map(str::to_string).collect(),
        Role::Assistant => renderer.render(&text),
    };
    if entry.streaming {
        match lines.last_mut() {
            Some(last) => last.push_str(STREAM_CURSOR),
            None => lines.push(STREAM_CURSOR.to_string()),
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// 构建对话区的全部行：每条消息先折叠过长内容，再按宽度换行；消息之间加空行分隔
pub fn transcript_lines(
    entries: &[MessageEntry],
    renderer: &dyn MarkdownRenderer,
    width: usize,
    max_chars: usize,
) -> Vec<Line<'static>> {
    let mut text_lines: Vec<Line<'static>> = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(Span::raw("")));
        }
        let (prefix, color) = match entry.role {
            Role::User => ("You ", Color::Cyan),
            Role::Assistant => ("Bot ", Color::Green),
        };

        let mut first = true;
        for raw in body_lines(entry, renderer, max_chars) {
            for line in wrap_text(&raw, width) {
                let pref = if first { prefix } else { "    " };
                first = false;
                text_lines.push(Line::from(vec![
                    Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Span::raw(line),
                ]));
            }
        }

        let Some(side) = entry.side_panel.as_ref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let side_style = Style::default().fg(Color::DarkGray);
        if entry.side_panel_toggle {
            let label = if entry.side_panel_visible {
                SIDE_PANEL_EXPANDED
            } else {
                SIDE_PANEL_COLLAPSED
            };
            text_lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(label, Style::default().fg(Color::Magenta)),
            ]));
        }
        if entry.side_panel_visible {
            for raw in side_panel_lines(side) {
                for line in wrap_text(&raw, width.saturating_sub(2)) {
                    text_lines.push(Line::from(vec![
                        Span::styled("    │ ", side_style),
                        Span::styled(line, side_style.add_modifier(Modifier::ITALIC)),
                    ]));
                }
            }
        }
    }
    text_lines
}

/// 绘制一帧：上方对话区（标题 + 记录 + 滚动条），下方输入区；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    renderer: &dyn MarkdownRenderer,
    max_chars: usize,
    conversation_scroll: usize,
    out: &mut (usize, usize),
) {
    // 输入区固定 5 行，便于多行输入可见
    let input_height = 5u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(input_height)])
        .split(f.area());

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(2).saturating_sub(1) as usize; // 边框 + 滚动条

    let mut title = format!(" Myrdal │ {} ", connection_label(state.connection));
    if state.loading {
        title.push_str("│ 处理中… ");
    }
    let border_color = match state.connection {
        ConnectionState::Open => Color::Yellow,
        ConnectionState::Connecting => Color::Gray,
        ConnectionState::Closed => Color::Red,
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    // 前缀占 4 列
    let text_lines = transcript_lines(
        &state.entries,
        renderer,
        content_width.saturating_sub(4).max(20),
        max_chars,
    );

    let content_height = conv_area.height.saturating_sub(2) as usize; // 边框
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = conversation_scroll.min(max_scroll);

    let inner = block.inner(conv_area);
    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((paragraph_scroll(scroll_offset), 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }

    let input_prompt = if state.input_locked {
        " 等待回复… "
    } else {
        " 输入 "
    };
    let hint = " Enter 发送 │ Alt+Enter 换行 │ Ctrl+T 思考过程 │ ↑↓ PgUp/PgDn 滚动 │ Esc 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if state.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });

    f.render_widget(input, chunks[1]);

    out.0 = total_lines;
    out.1 = content_height;
}
