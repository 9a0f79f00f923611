use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration, loaded from `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Aeon data directory; also holds persisted chat state.
    pub data_dir: PathBuf,

    /// Remote responder settings.
    pub responder: ResponderConfig,

    /// Reveal effect tuning. Presentation only, not correctness-critical.
    pub reveal: RevealConfig,
}

/// Remote responder endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Chat endpoint accepting `{message, files, mode}`.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Tuning for the incremental text reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Characters released per tick.
    pub chunk_size: usize,
    /// Milliseconds between ticks.
    pub tick_ms: u64,
}

impl RevealConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Config {
            data_dir: home.join(".aeon"),
            responder: ResponderConfig {
                endpoint: "http://127.0.0.1:5000/chat".to_string(),
                timeout_secs: 60,
            },
            reveal: RevealConfig {
                chunk_size: 4,
                tick_ms: 6,
            },
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let data_dir = home.join(".aeon");
        fs::create_dir_all(&data_dir).context("Failed to create .aeon directory")?;

        let config_path = data_dir.join("config.toml");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.data_dir = data_dir;
        Ok(config)
    }

    /// Save configuration to `<data_dir>/config.toml`.
    pub fn save(&self) -> Result<()> {
        let config_path = self.data_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.responder.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reveal_tuning_matches_shipped_values() {
        let config = Config::default();
        assert_eq!(config.reveal.chunk_size, 4);
        assert_eq!(config.reveal.tick_interval(), Duration::from_millis(6));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.responder.endpoint, config.responder.endpoint);
        assert_eq!(parsed.reveal.chunk_size, config.reveal.chunk_size);
    }
}
