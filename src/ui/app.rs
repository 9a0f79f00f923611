//! Terminal event loop binding the controller, the reveal scheduler and
//! the widgets together.

use crate::client::HttpResponder;
use crate::commands::{ParsedCommand, SlashCommand};
use crate::config::Config;
use crate::controller::{CommandEffect, ConversationController, TurnEvent};
use crate::mode::ChatMode;
use crate::render;
use crate::reveal::{RenderTarget, RevealHandle, RevealScheduler, RevealTick};
use crate::storage::Storage;
use crate::ui::composer::{Composer, ComposerResult};
use crate::ui::transcript::{Transcript, TranscriptView};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use std::io;
use std::sync::Arc;

struct App {
    controller: ConversationController,
    composer: Composer,
    transcript: Transcript,
    scheduler: RevealScheduler,
    reveal: Option<RevealHandle>,
    /// History sidebar selection; None means the composer has focus.
    selected: Option<usize>,
    should_quit: bool,
}

/// Run the chat TUI until the user quits.
pub async fn run(config: Config) -> Result<()> {
    let storage = Storage::new(&config.data_dir)?;
    let responder = Arc::new(HttpResponder::new(&config)?);
    let controller = ConversationController::new(storage, responder);

    let mut app = App {
        controller,
        composer: Composer::default(),
        transcript: Transcript::default(),
        scheduler: RevealScheduler::new(config.reveal.chunk_size),
        reveal: None,
        selected: None,
        should_quit: false,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = app.run_loop(&mut terminal, &config).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

impl App {
    async fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        config: &Config,
    ) -> Result<()> {
        let tick = config.reveal.tick_interval();
        let mut last_tick = std::time::Instant::now();

        while !self.should_quit {
            terminal.draw(|frame| {
                let area = frame.size();
                let buf = frame.buffer_mut();
                self.draw(area, buf);
            })?;

            // Cooperative cadence: input polling doubles as the reveal
            // tick interval.
            if event::poll(tick)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key)?;
                }
            }

            if let Some(outcome) = self.controller.try_poll_outcome() {
                match self.controller.handle_outcome(outcome) {
                    TurnEvent::RevealReply { text } => {
                        self.reveal = Some(self.scheduler.start(text));
                    }
                    TurnEvent::ErrorShown => {}
                }
            }

            if let Some(handle) = self.reveal {
                if last_tick.elapsed() >= tick {
                    last_tick = std::time::Instant::now();
                    if let RevealTick::Complete(text) =
                        self.scheduler.tick(handle, &mut self.transcript)
                    {
                        self.transcript.finalize(&render::render(&text));
                        self.controller.commit_revealed_reply()?;
                        self.reveal = None;
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('n') => self.dispatch(SlashCommand::New)?,
                KeyCode::Char('l') => self.dispatch(SlashCommand::Clear)?,
                KeyCode::Char('t') => self.dispatch(SlashCommand::Theme)?,
                KeyCode::Char('1') => self.controller.set_mode(ChatMode::Ai)?,
                KeyCode::Char('2') => self.controller.set_mode(ChatMode::Web)?,
                KeyCode::Char('3') => self.controller.set_mode(ChatMode::Auto)?,
                _ => {}
            }
            return Ok(());
        }

        // Arrow keys walk the history sidebar when the composer is empty.
        if self.composer.content().is_empty() {
            match key.code {
                KeyCode::Up => {
                    let len = self.controller.history().len();
                    if len > 0 {
                        self.selected = Some(match self.selected {
                            Some(i) => i.saturating_sub(1),
                            None => 0,
                        });
                    }
                    return Ok(());
                }
                KeyCode::Down => {
                    let len = self.controller.history().len();
                    if let Some(i) = self.selected {
                        self.selected = if i + 1 < len { Some(i + 1) } else { None };
                    }
                    return Ok(());
                }
                KeyCode::Enter if self.selected.is_some() => {
                    self.open_selected()?;
                    return Ok(());
                }
                KeyCode::Delete if self.selected.is_some() => {
                    self.delete_selected()?;
                    return Ok(());
                }
                KeyCode::Esc => {
                    self.selected = None;
                    return Ok(());
                }
                _ => {}
            }
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(input) => {
                // A still-running reveal finishes (committed in full)
                // before the next exchange starts.
                self.flush_reveal()?;
                self.controller.submit(&input);
            }
            ComposerResult::Command(command) => self.run_command(command)?,
            ComposerResult::None => {}
        }
        Ok(())
    }

    fn dispatch(&mut self, command: SlashCommand) -> Result<()> {
        self.run_command(ParsedCommand {
            command,
            argument: None,
        })
    }

    /// Commit a reveal that is being cut short so the exchange is not
    /// lost, and clear the partial text from the transcript.
    fn flush_reveal(&mut self) -> Result<()> {
        if self.reveal.take().is_some() {
            self.controller.commit_revealed_reply()?;
            self.transcript.clear_streaming();
        }
        Ok(())
    }

    fn run_command(&mut self, command: ParsedCommand) -> Result<()> {
        let resets_input = matches!(command.command, SlashCommand::New | SlashCommand::Clear);
        if resets_input {
            self.flush_reveal()?;
        }
        match self.controller.dispatch(command)? {
            CommandEffect::Quit => self.should_quit = true,
            CommandEffect::None => {}
        }
        if resets_input {
            self.composer.clear();
        }
        self.selected = None;
        Ok(())
    }

    fn open_selected(&mut self) -> Result<()> {
        let id = self
            .selected
            .and_then(|i| self.controller.history().get(i).map(|c| c.id.clone()));
        if let Some(id) = id {
            self.flush_reveal()?;
            self.controller.open_conversation(&id);
        }
        self.selected = None;
        Ok(())
    }

    fn delete_selected(&mut self) -> Result<()> {
        let id = self
            .selected
            .and_then(|i| self.controller.history().get(i).map(|c| c.id.clone()));
        if let Some(id) = id {
            self.flush_reveal()?;
            self.controller.delete_conversation(&id)?;
        }
        self.selected = None;
        Ok(())
    }

    fn draw(&self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(20)])
            .split(area);

        self.draw_sidebar(columns[0], buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(4)])
            .split(columns[1]);

        let view = TranscriptView {
            messages: self.controller.visible_messages(),
            show_welcome: self.controller.show_welcome(),
            mode: self.controller.mode(),
            theme: self.controller.theme(),
            awaiting: self.controller.is_awaiting_response(),
        };
        self.transcript.render(rows[0], buf, &view);

        self.composer.render(
            rows[1],
            buf,
            self.controller.mode(),
            self.controller.staged_files(),
            self.controller.is_awaiting_response(),
        );
    }

    fn draw_sidebar(&self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let items: Vec<ListItem> = self
            .controller
            .history()
            .iter()
            .enumerate()
            .map(|(i, conversation)| {
                let style = if self.selected == Some(i) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else if conversation.id == self.controller.current_conversation_id() {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::Gray)
                };
                ListItem::new(Line::from(Span::styled(
                    truncate(&conversation.title, area.width.saturating_sub(4) as usize),
                    style,
                )))
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("History (↑/↓, Del)"),
        );
        ratatui::widgets::Widget::render(list, area, buf);
    }
}

fn truncate(text: &str, max: usize) -> String {
    if max == 0 || text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_titles() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("a longer title here", 10), "a longe...");
    }
}
