//! Transcript display: message log, streaming reveal, welcome screen.

use crate::events::{Role, Theme};
use crate::mode::ChatMode;
use crate::render::{self, Fragment};
use crate::reveal::RenderTarget;
use crate::store::Message;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Borrowed view state for one frame.
pub struct TranscriptView<'a> {
    pub messages: &'a [Message],
    pub show_welcome: bool,
    pub mode: ChatMode,
    pub theme: Theme,
    pub awaiting: bool,
}

/// The reveal-and-history surface. Owns only the in-progress reveal
/// text; committed messages are borrowed from the controller each frame.
#[derive(Default)]
pub struct Transcript {
    streaming: Option<String>,
}

impl RenderTarget for Transcript {
    fn append_plain(&mut self, chunk: &str) {
        self.streaming.get_or_insert_with(String::new).push_str(chunk);
    }

    fn finalize(&mut self, _markup: &str) {
        // The partial plain text is discarded; the committed message now
        // renders through the formatted path.
        self.streaming = None;
    }
}

impl Transcript {
    pub fn is_revealing(&self) -> bool {
        self.streaming.is_some()
    }

    pub fn clear_streaming(&mut self) {
        self.streaming = None;
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, view: &TranscriptView<'_>) {
        let block = Block::default().borders(Borders::ALL).title("∞ Aeon");
        let inner = block.inner(area);
        block.render(area, buf);

        if view.show_welcome && self.streaming.is_none() {
            self.render_welcome(inner, buf, view);
            return;
        }

        let width = inner.width.saturating_sub(2) as usize;
        let mut lines: Vec<Line<'static>> = Vec::new();

        for message in view.messages {
            lines.extend(self.message_lines(message, width, view.theme));
            lines.push(Line::default());
        }

        if let Some(partial) = &self.streaming {
            lines.extend(self.streaming_lines(partial, width));
        } else if view.awaiting {
            lines.push(Line::from(Span::styled(
                format!("∞ Aeon is thinking ({})...", view.mode.badge()),
                Style::default().fg(Color::Green),
            )));
        }

        // Pin the view to the bottom.
        let height = inner.height as usize;
        let start = lines.len().saturating_sub(height);
        for (i, line) in lines[start..].iter().enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }
    }

    fn render_welcome(&self, area: Rect, buf: &mut Buffer, view: &TranscriptView<'_>) {
        let lines = [
            Line::from(Span::styled(
                "Welcome to Aeon ∞",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                view.mode.hint(),
                Style::default().fg(Color::Gray),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Enter sends, Shift+Enter inserts a newline, / lists commands.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "Ctrl+1/2/3 pick AI, Web or Auto mode. Ctrl+N starts a new chat.",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        for (i, line) in lines.iter().enumerate() {
            if i < area.height as usize {
                buf.set_line(area.x, area.y + i as u16, line, area.width);
            }
        }
    }

    fn message_lines(&self, message: &Message, width: usize, theme: Theme) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let accent = match message.role {
            Role::User => Color::Blue,
            Role::Assistant => Color::Green,
        };
        let mut header = vec![
            Span::styled(
                message.role.display_name().to_string(),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", message.timestamp.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if let Some(mode) = message.mode {
            header.push(Span::styled(
                format!("  [{}]", mode.indicator()),
                Style::default().fg(Color::Magenta),
            ));
        }
        lines.push(Line::from(header));

        if !message.files.is_empty() {
            let chips = message
                .files
                .iter()
                .map(|f| format!("📎 {}", f.name))
                .collect::<Vec<_>>()
                .join("  ");
            lines.push(Line::from(Span::styled(
                format!("  {chips}"),
                Style::default().fg(Color::DarkGray),
            )));
        }

        let text_style = match theme {
            Theme::Dark => Style::default().fg(Color::White),
            Theme::Light => Style::default().fg(Color::Gray),
        };
        lines.extend(fragment_lines(&message.content, width, text_style));
        lines
    }

    fn streaming_lines(&self, partial: &str, width: usize) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            "Aeon".to_string(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))];

        // Plain text only while revealing; formatting appears on handoff.
        let mut wrapped = wrap_spans(
            vec![Span::styled(
                partial.to_string(),
                Style::default().fg(Color::Gray),
            )],
            width,
        );
        if let Some(last) = wrapped.last_mut() {
            last.spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
        } else {
            wrapped.push(Line::from(Span::styled(
                "▋",
                Style::default().fg(Color::Yellow),
            )));
        }
        lines.extend(wrapped);
        lines
    }
}

/// Turn message content into styled, wrapped lines.
fn fragment_lines(content: &str, width: usize, base: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for fragment in render::parse(content) {
        match fragment {
            Fragment::LineBreak => {
                lines.extend(wrap_spans(std::mem::take(&mut current), width));
            }
            Fragment::Span(span) => {
                let mut style = base;
                if span.code {
                    style = Style::default().fg(Color::Yellow);
                }
                if span.bold {
                    style = style.add_modifier(Modifier::BOLD);
                }
                if span.italic {
                    style = style.add_modifier(Modifier::ITALIC);
                }
                current.push(Span::styled(span.text, style));
            }
            Fragment::CodeBlock { language, code } => {
                lines.extend(wrap_spans(std::mem::take(&mut current), width));
                lines.push(Line::from(Span::styled(
                    format!("── {language} ──"),
                    Style::default().fg(Color::DarkGray),
                )));
                for code_line in code.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {code_line}"),
                        Style::default().fg(Color::Yellow),
                    )));
                }
            }
        }
    }

    lines.extend(wrap_spans(current, width));
    lines
}

/// Greedy word wrap that keeps span styling intact.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    if spans.is_empty() {
        return Vec::new();
    }
    if width == 0 {
        return vec![Line::from(spans)];
    }

    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    for span in spans {
        let style = span.style;
        for word in span.content.split_inclusive(' ') {
            let len = word.chars().count();
            if used + len > width && used > 0 {
                lines.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            current.push(Span::styled(word.to_string(), style));
            used += len;
        }
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_finalize_discards_partial_text() {
        let mut transcript = Transcript::default();
        transcript.append_plain("Hi th");
        transcript.append_plain("ere");
        assert!(transcript.is_revealing());

        transcript.finalize("<strong>Hi there</strong>");
        assert!(!transcript.is_revealing());
    }

    #[test]
    fn wrap_preserves_all_words() {
        let lines = wrap_spans(
            vec![Span::raw("alpha beta gamma delta epsilon")],
            10,
        );
        assert!(lines.len() > 1);
        let joined: String = lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.content.to_string()))
            .collect();
        assert_eq!(joined, "alpha beta gamma delta epsilon");
    }

    #[test]
    fn fragment_lines_splits_code_blocks_out() {
        let lines = fragment_lines("before\n```rust\nlet x = 1;\n```", 40, Style::default());
        let rendered: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.to_string()).collect())
            .collect();
        assert!(rendered.iter().any(|l| l.contains("before")));
        assert!(rendered.iter().any(|l| l.contains("── rust ──")));
        assert!(rendered.iter().any(|l| l.contains("let x = 1;")));
    }
}
