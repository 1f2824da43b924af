//! Markdown 渲染：把 Markdown 源文本转成可直接显示的终端行
//!
//! 原始 HTML 块与行内 HTML 一律丢弃，服务端内容不会以标记形式出现在界面上。

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Markdown 渲染器接口；界面层只依赖该 trait
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> Vec<String>;
}

/// 基于 pulldown-cmark 的纯文本终端渲染
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalMarkdown;

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, source: &str) -> Vec<String> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        let mut writer = LineWriter::default();
        for event in Parser::new_ext(source, options) {
            writer.handle(event);
        }
        writer.finish()
    }
}

#[derive(Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(u64),
}

#[derive(Default)]
struct LineWriter {
    lines: Vec<String>,
    current: String,
    lists: Vec<ListKind>,
    quote_depth: usize,
    in_code: bool,
    link: Option<String>,
}

impl LineWriter {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_text(&format!("`{code}`")),
            Event::SoftBreak | Event::HardBreak => self.newline(),
            Event::Rule => {
                self.newline();
                self.push_text("───");
                self.newline();
            }
            Event::TaskListMarker(done) => self.push_text(if done { "[x] " } else { "[ ] " }),
            // Html / InlineHtml 丢弃
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.current.is_empty() {
                    self.newline();
                }
            }
            Tag::Heading { level, .. } => {
                if !self.current.is_empty() {
                    self.newline();
                }
                self.prefix();
                self.current.push_str(&"#".repeat(level as usize));
                self.current.push(' ');
            }
            Tag::BlockQuote => self.quote_depth += 1,
            Tag::CodeBlock(kind) => {
                self.newline();
                let fence = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                        format!("```{}", lang.trim())
                    }
                    _ => "```".to_string(),
                };
                self.push_text(&fence);
                self.newline();
                self.in_code = true;
            }
            Tag::List(start) => self.lists.push(match start {
                Some(n) => ListKind::Ordered(n),
                None => ListKind::Bullet,
            }),
            Tag::Item => {
                if !self.current.is_empty() {
                    self.newline();
                }
                self.prefix();
                if let Some(kind) = self.lists.last_mut() {
                    match kind {
                        ListKind::Bullet => self.current.push_str("• "),
                        ListKind::Ordered(n) => {
                            self.current.push_str(&format!("{}. ", n));
                            *n += 1;
                        }
                    }
                }
            }
            Tag::Link { dest_url, .. } => self.link = Some(dest_url.to_string()),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::TableRow | TagEnd::TableHead => {
                self.newline()
            }
            TagEnd::TableCell => self.current.push_str(" │ "),
            TagEnd::BlockQuote => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.newline();
            }
            TagEnd::CodeBlock => {
                self.in_code = false;
                if !self.current.is_empty() {
                    self.lines.push(std::mem::take(&mut self.current));
                }
                self.push_text("```");
                self.newline();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.newline();
            }
            TagEnd::Link => {
                if let Some(url) = self.link.take() {
                    self.current.push_str(&format!(" ({})", url));
                }
            }
            _ => {}
        }
    }

    fn prefix(&mut self) {
        if self.quote_depth > 0 {
            self.current
                .push_str(&format!("{} ", ">".repeat(self.quote_depth)));
        }
        if self.lists.len() > 1 {
            self.current.push_str(&"  ".repeat(self.lists.len() - 1));
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.in_code {
            // 代码块文本自带换行，按行拆开保持原样
            for (i, part) in text.split('\n').enumerate() {
                if i > 0 {
                    self.lines.push(std::mem::take(&mut self.current));
                }
                self.current.push_str(part);
            }
            return;
        }
        if self.current.is_empty() {
            self.prefix();
        }
        self.current.push_str(text);
    }

    fn newline(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        } else if self.lines.last().map_or(false, |l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() {
            self.lines.push(self.current);
        }
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
