use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted key names. One file per key under the data directory.
pub const HISTORY_KEY: &str = "aeon-chat-history";
pub const MODE_KEY: &str = "aeon-mode";
pub const THEME_KEY: &str = "aeon-theme";

/// Durable key/value storage backed by plain files in the aeon data
/// directory. Every write is a full snapshot: the value is written to a
/// temporary file and renamed into place, so a failed persist leaves the
/// previous value intact.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).context("Failed to create aeon data directory")?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Read a value, or `None` when the key has never been written.
    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    /// Write a full snapshot for `key` atomically.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)
            .with_context(|| format!("Failed to write snapshot for '{}'", key))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to commit snapshot for '{}'", key))?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn get_returns_none_for_missing_key() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        assert_eq!(storage.get("aeon-mode"), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        storage.set(MODE_KEY, "web").unwrap();
        assert_eq!(storage.get(MODE_KEY).as_deref(), Some("web"));
    }

    #[test]
    fn set_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        storage.set(THEME_KEY, "light").unwrap();
        storage.set(THEME_KEY, "dark").unwrap();
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn snapshot_lands_under_the_key_name() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        storage.set(HISTORY_KEY, "[]").unwrap();
        assert!(storage.data_dir().join(HISTORY_KEY).exists());
    }
}
