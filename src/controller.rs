use crate::client::{ChatRequest, Responder};
use crate::commands::{ParsedCommand, SlashCommand, get_help_text};
use crate::events::{FileMeta, ResponseOutcome, Theme};
use crate::mode::{ChatMode, ModeSelector};
use crate::storage::{Storage, THEME_KEY};
use crate::store::{Conversation, ConversationStore, Message};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Submission state. While a request is in flight, further submissions
/// are rejected; nothing is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    AwaitingResponse,
}

/// What the event loop should do after a response outcome is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Successful reply; start revealing this text.
    RevealReply { text: String },
    /// Failure already surfaced as a visible assistant message.
    ErrorShown,
}

/// Effect of dispatching a slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    None,
    Quit,
}

/// An exchange accepted by the responder but not yet committed: the
/// assistant text is still being revealed.
#[derive(Debug, Clone)]
struct PendingExchange {
    conversation_id: String,
    user: Message,
    text: String,
    mode_used: ChatMode,
}

/// Orchestrates message submission: owns the Idle/AwaitingResponse state
/// machine and binds the store, the mode selector and the remote
/// responder together. The `visible` buffer mirrors the transcript for
/// the active conversation, including synthesized error messages that are
/// never persisted.
pub struct ConversationController {
    store: ConversationStore,
    modes: ModeSelector,
    theme: Theme,
    storage: Storage,
    responder: Arc<dyn Responder>,
    state: SubmitState,
    staged_files: Vec<FileMeta>,
    visible: Vec<Message>,
    pending: Option<PendingExchange>,
    outcome_tx: mpsc::UnboundedSender<ResponseOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ResponseOutcome>,
}

impl ConversationController {
    pub fn new(storage: Storage, responder: Arc<dyn Responder>) -> Self {
        let store = ConversationStore::load(storage.clone());
        let modes = ModeSelector::load(storage.clone());
        let theme = storage
            .get(THEME_KEY)
            .map(|v| Theme::parse(&v))
            .unwrap_or_default();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            store,
            modes,
            theme,
            storage,
            responder,
            state: SubmitState::Idle,
            staged_files: Vec::new(),
            visible: Vec::new(),
            pending: None,
            outcome_tx,
            outcome_rx,
        }
    }

    // --- view state ---

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.state == SubmitState::AwaitingResponse
    }

    /// Transcript of the active conversation, including unpersisted
    /// error and help messages.
    pub fn visible_messages(&self) -> &[Message] {
        &self.visible
    }

    /// The welcome view shows until the active conversation has content.
    pub fn show_welcome(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn mode(&self) -> ChatMode {
        self.modes.mode()
    }

    pub fn set_mode(&mut self, mode: ChatMode) -> Result<()> {
        self.modes.set_mode(mode)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> Result<()> {
        self.theme = self.theme.toggled();
        self.storage.set(THEME_KEY, self.theme.as_str())
    }

    pub fn history(&self) -> Vec<&Conversation> {
        self.store.list()
    }

    pub fn current_conversation_id(&self) -> &str {
        self.store.current_id()
    }

    // --- file staging ---

    pub fn staged_files(&self) -> &[FileMeta] {
        &self.staged_files
    }

    /// Stage a file of any type.
    pub fn attach_file(&mut self, file: FileMeta) {
        self.staged_files.push(file);
    }

    /// Stage files from the image-only intake; non-images are silently
    /// filtered.
    pub fn attach_images(&mut self, files: Vec<FileMeta>) {
        self.staged_files.extend(files.into_iter().filter(FileMeta::is_image));
    }

    pub fn remove_staged(&mut self, index: usize) {
        if index < self.staged_files.len() {
            self.staged_files.remove(index);
        }
    }

    pub fn clear_staged(&mut self) {
        self.staged_files.clear();
    }

    /// Stage a file named by path; with no path, clear the staging area.
    /// Unreadable paths and filtered files are dropped quietly.
    fn stage_from_path(&mut self, path: Option<&str>, image_only: bool) {
        let Some(path) = path else {
            self.clear_staged();
            return;
        };
        match FileMeta::from_path(std::path::Path::new(path)) {
            Ok(file) if image_only => self.attach_images(vec![file]),
            Ok(file) => self.attach_file(file),
            Err(e) => warn!("could not stage {path}: {e}"),
        }
    }

    // --- submission state machine ---

    /// Submit the composed message. Returns false when nothing was
    /// submitted: empty input, or a request already in flight.
    pub fn submit(&mut self, input: &str) -> bool {
        let message = input.trim().to_string();
        if self.state != SubmitState::Idle {
            return false;
        }
        if message.is_empty() && self.staged_files.is_empty() {
            return false;
        }

        let files = std::mem::take(&mut self.staged_files);
        let user = Message::user(message.clone(), files.clone());
        self.visible.push(user.clone());

        let mode = self.modes.mode();
        let conversation_id = self.store.current_id().to_string();
        self.pending = Some(PendingExchange {
            conversation_id,
            user,
            text: String::new(),
            mode_used: mode,
        });
        self.state = SubmitState::AwaitingResponse;

        let responder = Arc::clone(&self.responder);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let outcome = match responder.send(ChatRequest { message, files, mode }).await {
                Ok(reply) => ResponseOutcome::Success {
                    mode_used: reply
                        .mode_used
                        .as_deref()
                        .map(ChatMode::parse_or_default)
                        .unwrap_or(mode),
                    text: reply.response,
                },
                Err(e) => ResponseOutcome::Failure {
                    message: e.to_string(),
                },
            };
            // Receiver only drops on shutdown.
            let _ = tx.send(outcome);
        });

        true
    }

    /// Non-blocking check for a finished request (event-loop driven).
    pub fn try_poll_outcome(&mut self) -> Option<ResponseOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    /// Await the in-flight request's outcome.
    pub async fn wait_outcome(&mut self) -> Option<ResponseOutcome> {
        if self.state != SubmitState::AwaitingResponse {
            return None;
        }
        self.outcome_rx.recv().await
    }

    /// Handle a response outcome. The state returns to Idle
    /// unconditionally; there are no retries.
    pub fn handle_outcome(&mut self, outcome: ResponseOutcome) -> TurnEvent {
        self.state = SubmitState::Idle;
        match outcome {
            ResponseOutcome::Success { text, mode_used } => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.text = text.clone();
                    pending.mode_used = mode_used;
                }
                TurnEvent::RevealReply { text }
            }
            ResponseOutcome::Failure { message } => {
                self.pending = None;
                self.visible.push(Message::assistant_note(format!(
                    "I apologize, but I encountered an error: {message}"
                )));
                TurnEvent::ErrorShown
            }
        }
    }

    /// Commit the revealed reply: append the user/assistant pair to the
    /// store and persist. Called exactly once, after the reveal finishes.
    pub fn commit_revealed_reply(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let assistant = Message::assistant(pending.text, pending.mode_used);
        if pending.conversation_id == self.store.current_id() {
            self.visible.push(assistant.clone());
        }
        self.store
            .append_exchange(&pending.conversation_id, pending.user, assistant)
    }

    // --- conversation management ---

    pub fn start_new_chat(&mut self) {
        self.store.start_new();
        self.visible.clear();
        self.staged_files.clear();
    }

    /// Load an existing conversation into the transcript.
    pub fn open_conversation(&mut self, id: &str) -> bool {
        if !self.store.switch_to(id) {
            return false;
        }
        self.visible = self
            .store
            .get(id)
            .map(|c| c.messages.clone())
            .unwrap_or_default();
        true
    }

    /// Delete a conversation. Deleting the active one resets to a fresh
    /// empty conversation, which brings the welcome view back.
    pub fn delete_conversation(&mut self, id: &str) -> Result<()> {
        let was_current = self.store.delete(id)?;
        if was_current {
            self.visible.clear();
            self.staged_files.clear();
        }
        Ok(())
    }

    // --- command dispatch ---

    /// Dispatch a parsed slash command. Unknown mode arguments are
    /// ignored with a logged warning rather than surfaced as errors.
    pub fn dispatch(&mut self, command: ParsedCommand) -> Result<CommandEffect> {
        match command.command {
            SlashCommand::New => {
                self.start_new_chat();
                Ok(CommandEffect::None)
            }
            SlashCommand::Clear => {
                let id = self.store.current_id().to_string();
                self.delete_conversation(&id)?;
                Ok(CommandEffect::None)
            }
            SlashCommand::Mode => {
                match command.mode_target() {
                    Some(mode) => self.set_mode(mode)?,
                    None => warn!("unrecognized mode argument: {:?}", command.argument()),
                }
                Ok(CommandEffect::None)
            }
            SlashCommand::Attach => {
                self.stage_from_path(command.argument(), false);
                Ok(CommandEffect::None)
            }
            SlashCommand::Image => {
                self.stage_from_path(command.argument(), true);
                Ok(CommandEffect::None)
            }
            SlashCommand::Theme => {
                self.toggle_theme()?;
                Ok(CommandEffect::None)
            }
            SlashCommand::Help => {
                self.visible.push(Message::assistant_note(get_help_text()));
                Ok(CommandEffect::None)
            }
            SlashCommand::Quit => Ok(CommandEffect::Quit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatReply, ResponderError};
    use crate::events::Role;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedResponder {
        reply: Result<ChatReply, ResponderError>,
    }

    #[async_trait]
    impl Responder for FixedResponder {
        async fn send(&self, _request: ChatRequest) -> Result<ChatReply, ResponderError> {
            self.reply.clone()
        }
    }

    fn success(text: &str, mode_used: &str) -> Arc<dyn Responder> {
        Arc::new(FixedResponder {
            reply: Ok(ChatReply {
                response: text.to_string(),
                mode_used: Some(mode_used.to_string()),
            }),
        })
    }

    fn failure(error: &str) -> Arc<dyn Responder> {
        Arc::new(FixedResponder {
            reply: Err(ResponderError::Api(error.to_string())),
        })
    }

    fn controller(dir: &TempDir, responder: Arc<dyn Responder>) -> ConversationController {
        ConversationController::new(Storage::new(dir.path()).unwrap(), responder)
    }

    async fn run_turn(controller: &mut ConversationController, input: &str) -> TurnEvent {
        assert!(controller.submit(input));
        let outcome = controller.wait_outcome().await.unwrap();
        controller.handle_outcome(outcome)
    }

    #[tokio::test]
    async fn successful_turn_reveals_then_commits() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("Hi there", "ai"));

        let event = run_turn(&mut controller, "Hello").await;
        assert_eq!(event, TurnEvent::RevealReply { text: "Hi there".to_string() });
        assert_eq!(controller.state(), SubmitState::Idle);

        controller.commit_revealed_reply().unwrap();
        let history = controller.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title, "Hello");
        assert_eq!(history[0].messages.len(), 2);
        assert_eq!(history[0].messages[0].content, "Hello");
        assert_eq!(history[0].messages[1].content, "Hi there");
        assert_eq!(history[0].messages[1].mode.unwrap().indicator(), "AI");
    }

    #[tokio::test]
    async fn submission_rejected_while_awaiting_response() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("ok", "ai"));

        assert!(controller.submit("first"));
        assert!(controller.is_awaiting_response());
        assert!(!controller.submit("second"));

        let outcome = controller.wait_outcome().await.unwrap();
        controller.handle_outcome(outcome);
        assert!(!controller.is_awaiting_response());
    }

    #[tokio::test]
    async fn empty_input_without_files_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("ok", "ai"));
        assert!(!controller.submit("   "));
    }

    #[tokio::test]
    async fn files_alone_are_submittable_and_staging_clears() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("got it", "ai"));
        controller.attach_file(FileMeta::new("notes.txt", "text/plain", 64));

        assert!(controller.submit(""));
        assert!(controller.staged_files().is_empty());
        assert_eq!(controller.visible_messages()[0].files.len(), 1);

        let outcome = controller.wait_outcome().await.unwrap();
        controller.handle_outcome(outcome);
        controller.commit_revealed_reply().unwrap();
        assert_eq!(controller.history()[0].title, "New Chat");
    }

    #[tokio::test]
    async fn failure_shows_error_and_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, failure("rate limited"));

        let event = run_turn(&mut controller, "Hello").await;
        assert_eq!(event, TurnEvent::ErrorShown);

        let errors: Vec<_> = controller
            .visible_messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].content.contains("rate limited"));
        assert_eq!(errors[0].mode, None);
        assert!(controller.history().is_empty());

        // Committing after a failure is a no-op.
        controller.commit_revealed_reply().unwrap();
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn image_intake_silently_filters_non_images() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("ok", "ai"));
        controller.attach_images(vec![
            FileMeta::new("photo.jpg", "image/jpeg", 100),
            FileMeta::new("report.pdf", "application/pdf", 100),
        ]);
        assert_eq!(controller.staged_files().len(), 1);
        assert_eq!(controller.staged_files()[0].name, "photo.jpg");
    }

    #[tokio::test]
    async fn deleting_active_conversation_brings_welcome_back() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("Hi", "ai"));

        run_turn(&mut controller, "Hello").await;
        controller.commit_revealed_reply().unwrap();
        assert!(!controller.show_welcome());

        let id = controller.current_conversation_id().to_string();
        controller.delete_conversation(&id).unwrap();
        assert!(controller.show_welcome());
        assert_ne!(controller.current_conversation_id(), id);
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn open_conversation_restores_transcript() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("Hi", "ai"));

        run_turn(&mut controller, "Hello").await;
        controller.commit_revealed_reply().unwrap();
        let id = controller.current_conversation_id().to_string();

        controller.start_new_chat();
        assert!(controller.show_welcome());

        assert!(controller.open_conversation(&id));
        assert_eq!(controller.visible_messages().len(), 2);
        assert!(!controller.open_conversation("missing"));
    }

    #[tokio::test]
    async fn mode_used_falls_back_to_requested_mode() {
        let dir = TempDir::new().unwrap();
        let responder: Arc<dyn Responder> = Arc::new(FixedResponder {
            reply: Ok(ChatReply {
                response: "Hi".to_string(),
                mode_used: None,
            }),
        });
        let mut controller = controller(&dir, responder);
        controller.set_mode(ChatMode::Web).unwrap();

        run_turn(&mut controller, "news?").await;
        controller.commit_revealed_reply().unwrap();
        assert_eq!(controller.history()[0].messages[1].mode, Some(ChatMode::Web));
    }

    #[tokio::test]
    async fn theme_toggle_persists() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("ok", "ai"));
        assert_eq!(controller.theme(), Theme::Light);
        controller.toggle_theme().unwrap();
        assert_eq!(controller.theme(), Theme::Dark);

        let reloaded = ConversationController::new(
            Storage::new(dir.path()).unwrap(),
            success("ok", "ai"),
        );
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[tokio::test]
    async fn attach_command_stages_and_clears() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("ok", "ai"));
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let attach =
            crate::commands::parse_slash_command(&format!("/attach {}", path.display())).unwrap();
        controller.dispatch(attach).unwrap();
        assert_eq!(controller.staged_files().len(), 1);
        assert_eq!(controller.staged_files()[0].mime, "text/plain");

        let clear = crate::commands::parse_slash_command("/attach").unwrap();
        controller.dispatch(clear).unwrap();
        assert!(controller.staged_files().is_empty());
    }

    #[tokio::test]
    async fn image_command_filters_non_images_silently() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("ok", "ai"));
        let doc = dir.path().join("report.pdf");
        let pic = dir.path().join("photo.png");
        std::fs::write(&doc, "x").unwrap();
        std::fs::write(&pic, "x").unwrap();

        let parsed =
            crate::commands::parse_slash_command(&format!("/image {}", doc.display())).unwrap();
        controller.dispatch(parsed).unwrap();
        assert!(controller.staged_files().is_empty());

        let parsed =
            crate::commands::parse_slash_command(&format!("/image {}", pic.display())).unwrap();
        controller.dispatch(parsed).unwrap();
        assert_eq!(controller.staged_files().len(), 1);
        assert!(controller.staged_files()[0].is_image());
    }

    #[tokio::test]
    async fn quit_command_dispatches_through_table() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, success("ok", "ai"));
        let parsed = crate::commands::parse_slash_command("/quit").unwrap();
        assert_eq!(controller.dispatch(parsed).unwrap(), CommandEffect::Quit);
    }
}
