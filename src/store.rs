use crate::events::{FileMeta, Role, now};
use crate::mode::ChatMode;
use crate::storage::{HISTORY_KEY, Storage};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Maximum number of conversations kept in persisted history.
pub const RETENTION_CAP: usize = 50;

/// Words kept when deriving a conversation title from its first message.
const TITLE_WORDS: usize = 5;

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileMeta>,
    pub timestamp: DateTime<Utc>,
    /// Mode the responder actually used; assistant messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ChatMode>,
}

impl Message {
    pub fn user(content: impl Into<String>, files: Vec<FileMeta>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            files,
            timestamp: now(),
            mode: None,
        }
    }

    pub fn assistant(content: impl Into<String>, mode: ChatMode) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            files: Vec::new(),
            timestamp: now(),
            mode: Some(mode),
        }
    }

    /// Assistant-role message with no mode indicator: synthesized error
    /// descriptions and help text. Never persisted as part of an exchange.
    pub fn assistant_note(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            files: Vec::new(),
            timestamp: now(),
            mode: None,
        }
    }
}

/// A titled, ordered log of message exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    fn placeholder(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            messages: Vec::new(),
            created_at: now(),
        }
    }
}

/// Generate a fresh opaque conversation identifier.
pub fn new_conversation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Derive a title from the first user message: at most five words, with an
/// ellipsis when the message runs longer.
pub fn derive_title(text: &str) -> String {
    let trimmed = text.trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.is_empty() {
        return "New Chat".to_string();
    }
    if words.len() <= TITLE_WORDS {
        return trimmed.to_string();
    }
    format!("{}...", words[..TITLE_WORDS].join(" "))
}

/// Durable mapping of conversation id to message log. Owns all
/// conversation data and is the sole writer of the persisted history
/// snapshot.
#[derive(Debug)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current_id: String,
    storage: Storage,
}

impl ConversationStore {
    /// Load persisted history. Malformed data is discarded with a logged
    /// warning and the store starts empty; this is never surfaced as an
    /// error.
    pub fn load(storage: Storage) -> Self {
        let conversations = match storage.get(HISTORY_KEY) {
            Some(raw) => match serde_json::from_str::<Vec<Conversation>>(&raw) {
                Ok(conversations) => conversations,
                Err(e) => {
                    warn!("discarding corrupt chat history: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Self {
            conversations,
            current_id: new_conversation_id(),
            storage,
        }
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    /// The current conversation, if it has completed an exchange yet.
    pub fn current(&self) -> Option<&Conversation> {
        self.get(&self.current_id)
    }

    /// Existing current conversation, or an unpersisted placeholder. The
    /// placeholder becomes real only once `append_exchange` runs.
    pub fn create_or_get_current(&self) -> Conversation {
        self.current()
            .cloned()
            .unwrap_or_else(|| Conversation::placeholder(self.current_id.clone()))
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Switch the current conversation to an existing one.
    pub fn switch_to(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.current_id = id.to_string();
            true
        } else {
            false
        }
    }

    /// Abandon the current conversation and point at a fresh empty one.
    /// Buffered-but-unpersisted state is simply dropped.
    pub fn start_new(&mut self) -> &str {
        self.current_id = new_conversation_id();
        &self.current_id
    }

    /// Append a user/assistant pair to the given conversation, creating it
    /// (titled from the user text) when this is its first exchange.
    /// Enforces the retention cap and persists synchronously. Messages are
    /// only ever appended as a pair, matching the request/response cycle.
    pub fn append_exchange(&mut self, id: &str, user: Message, assistant: Message) -> Result<()> {
        let index = match self.conversations.iter().position(|c| c.id == id) {
            Some(index) => index,
            None => {
                self.conversations.push(Conversation {
                    id: id.to_string(),
                    title: derive_title(&user.content),
                    messages: Vec::new(),
                    created_at: now(),
                });
                self.conversations.len() - 1
            }
        };

        let conversation = &mut self.conversations[index];
        conversation.messages.push(user);
        conversation.messages.push(assistant);

        // Oldest first, by insertion order.
        while self.conversations.len() > RETENTION_CAP {
            self.conversations.remove(0);
        }

        self.persist()
    }

    /// Remove a conversation. Deleting the current one resets to a fresh
    /// empty conversation; returns whether that reset happened.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        self.conversations.retain(|c| c.id != id);
        self.persist()?;

        let was_current = id == self.current_id;
        if was_current {
            self.current_id = new_conversation_id();
        }
        Ok(was_current)
    }

    /// Remove every persisted conversation.
    pub fn clear(&mut self) -> Result<()> {
        self.conversations.clear();
        self.current_id = new_conversation_id();
        self.persist()
    }

    /// Conversations for the history panel, most recent first. The
    /// still-empty current placeholder never appears here.
    pub fn list(&self) -> Vec<&Conversation> {
        self.conversations.iter().rev().collect()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Write the full history snapshot.
    fn persist(&self) -> Result<()> {
        let snapshot = serde_json::to_string(&self.conversations)
            .context("Failed to serialize chat history")?;
        self.storage.set(HISTORY_KEY, &snapshot)
    }
}
