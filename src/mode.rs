use crate::storage::{MODE_KEY, Storage};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{EnumString, IntoStaticStr};

/// Response strategy requested from the remote responder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Ai,
    Web,
    Auto,
}

impl ChatMode {
    /// Wire value sent to the responder.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Short badge text shown next to the composer.
    pub fn badge(self) -> &'static str {
        match self {
            ChatMode::Ai => "AI",
            ChatMode::Web => "Web",
            ChatMode::Auto => "Auto",
        }
    }

    /// Per-message indicator label for assistant replies.
    pub fn indicator(self) -> &'static str {
        match self {
            ChatMode::Ai => "AI",
            ChatMode::Web => "Web Search",
            ChatMode::Auto => "Auto",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ChatMode::Ai => "AI Mode: Creative tasks, coding, general knowledge",
            ChatMode::Web => "Web Search Mode: Real-time information, news, current events",
            ChatMode::Auto => "Auto Mode: Smart detection between AI and web search",
        }
    }

    /// Lenient parse for persisted and wire values; anything outside the
    /// closed set falls back to `ai`.
    pub fn parse_or_default(value: &str) -> ChatMode {
        ChatMode::from_str(value.trim()).unwrap_or_default()
    }
}

/// Tracks the active response mode and keeps it persisted.
#[derive(Debug, Clone)]
pub struct ModeSelector {
    mode: ChatMode,
    storage: Storage,
}

impl ModeSelector {
    /// Restore the persisted preference, defaulting to `ai`.
    pub fn load(storage: Storage) -> Self {
        let mode = storage
            .get(MODE_KEY)
            .map(|v| ChatMode::parse_or_default(&v))
            .unwrap_or_default();
        Self { mode, storage }
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// Update and persist the active mode. Setting the current mode again
    /// is a no-op.
    pub fn set_mode(&mut self, mode: ChatMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        self.mode = mode;
        self.storage.set(MODE_KEY, mode.as_str())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn selector(dir: &TempDir) -> ModeSelector {
        ModeSelector::load(Storage::new(dir.path()).unwrap())
    }

    #[test]
    fn defaults_to_ai_when_nothing_persisted() {
        let dir = TempDir::new().unwrap();
        assert_eq!(selector(&dir).mode(), ChatMode::Ai);
    }

    #[test]
    fn set_mode_persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let mut selector = selector(&dir);
        selector.set_mode(ChatMode::Web).unwrap();

        let reloaded = ModeSelector::load(Storage::new(dir.path()).unwrap());
        assert_eq!(reloaded.mode(), ChatMode::Web);
    }

    #[test]
    fn set_mode_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut selector = selector(&dir);
        selector.set_mode(ChatMode::Auto).unwrap();
        let persisted = Storage::new(dir.path()).unwrap().get(MODE_KEY);

        selector.set_mode(ChatMode::Auto).unwrap();
        assert_eq!(selector.mode(), ChatMode::Auto);
        assert_eq!(Storage::new(dir.path()).unwrap().get(MODE_KEY), persisted);
    }

    #[test]
    fn unrecognized_persisted_value_falls_back_to_ai() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        storage.set(MODE_KEY, "turbo").unwrap();
        assert_eq!(ModeSelector::load(storage).mode(), ChatMode::Ai);
    }
}
