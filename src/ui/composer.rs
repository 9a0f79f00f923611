//! Message composer: input editing and submit/command detection.

use crate::commands::{ParsedCommand, parse_slash_command};
use crate::events::FileMeta;
use crate::mode::ChatMode;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result of feeding a key to the composer.
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Single-field text editor for the message being composed.
#[derive(Default)]
pub struct Composer {
    content: String,
    /// Byte offset, always on a char boundary.
    cursor: usize,
}

impl Composer {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert('\n');
                } else if !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    if let Some(command) = parse_slash_command(content.trim()) {
                        return ComposerResult::Command(command);
                    }
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Backspace => {
                if let Some(prev) = self.prev_boundary() {
                    self.content.remove(prev);
                    self.cursor = prev;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.content.len() {
                    self.content.remove(self.cursor);
                }
            }
            KeyCode::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
            }
            KeyCode::Right => {
                if let Some(c) = self.content[self.cursor..].chars().next() {
                    self.cursor += c.len_utf8();
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    fn insert(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor].char_indices().last().map(|(i, _)| i)
    }

    pub fn render(
        &self,
        area: Rect,
        buf: &mut Buffer,
        mode: ChatMode,
        staged: &[FileMeta],
        awaiting: bool,
    ) {
        let title = if awaiting {
            format!("[{}] waiting for response...", mode.badge())
        } else {
            format!("[{}] Message Aeon", mode.badge())
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if awaiting {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Cyan)
            });

        let inner = block.inner(area);
        block.render(area, buf);

        let mut y = inner.y;
        if !staged.is_empty() {
            let chips = staged
                .iter()
                .map(|f| format!("📎 {} ({})", f.name, f.mime))
                .collect::<Vec<_>>()
                .join("  ");
            let line = Line::from(Span::styled(chips, Style::default().fg(Color::DarkGray)));
            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
        }

        if self.content.is_empty() {
            let placeholder = Line::from(Span::styled(
                "Type a message, or / for commands",
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner.x, y, &placeholder, inner.width);
        } else {
            let mut shown = self.content.clone();
            if !awaiting {
                shown.insert(self.cursor.min(shown.len()), '▌');
            }
            for (i, text) in shown.split('\n').enumerate() {
                if y + (i as u16) < inner.y + inner.height {
                    let line = Line::from(Span::raw(text.to_string()));
                    buf.set_line(inner.x, y + i as u16, &line, inner.width);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(composer: &mut Composer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_trimmed_nonempty_content() {
        let mut composer = Composer::default();
        type_str(&mut composer, "hello");
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("hello".to_string())
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn enter_on_blank_content_does_nothing() {
        let mut composer = Composer::default();
        type_str(&mut composer, "   ");
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = Composer::default();
        type_str(&mut composer, "a");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_str(&mut composer, "b");
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn slash_input_parses_to_command() {
        let mut composer = Composer::default();
        type_str(&mut composer, "/new");
        match composer.handle_key(press(KeyCode::Enter)) {
            ComposerResult::Command(parsed) => assert_eq!(parsed.command, SlashCommand::New),
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn editing_respects_multibyte_boundaries() {
        let mut composer = Composer::default();
        type_str(&mut composer, "héllo");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "hélo");
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Right));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "élo");
    }
}
