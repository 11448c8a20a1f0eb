//! Configuration file parser for ~/.config/freshfeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::feed::{
    FeedSettings, ListLayout, RestoreConfig, TriggerConfig, VirtualList, WindowConfig,
    SENTINEL_HEIGHT,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but cannot be used.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of posts materialized at once.
    pub window_size: usize,

    /// Minimum time between two slides, in milliseconds.
    pub load_cooldown_ms: u64,

    /// Delay before a slide commits, in milliseconds.
    pub settle_delay_ms: u64,

    /// Quiet period after typing before a search runs, in milliseconds.
    pub search_debounce_ms: u64,

    /// Maximum number of search matches.
    pub search_limit: i64,

    /// Scroll restore attempts before giving up.
    pub restore_attempts: u32,

    /// Pause between scroll restore attempts, in milliseconds.
    pub restore_interval_ms: u64,

    /// Whether long lists switch to the virtualized strategy.
    pub virtualize: bool,

    /// Lists with more items than this are virtualized.
    pub virtualize_threshold: usize,

    /// Settle time after hydration before virtualizing, in milliseconds.
    pub virtualize_delay_ms: u64,

    /// Fixed row height of the list, in layout pixels.
    pub row_height: f64,

    /// Rows rendered beyond each side of the viewport when virtualized.
    pub overscan: usize,

    /// Distance in rows from an unloaded row at which more is requested.
    pub load_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_size: 20,
            load_cooldown_ms: 1000,
            settle_delay_ms: 300,
            search_debounce_ms: 400,
            search_limit: 20,
            restore_attempts: 30,
            restore_interval_ms: 300,
            virtualize: true,
            virtualize_threshold: 10,
            virtualize_delay_ms: 1000,
            row_height: 450.0,
            overscan: 5,
            load_threshold: 5,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 13] = [
        "window_size",
        "load_cooldown_ms",
        "settle_delay_ms",
        "search_debounce_ms",
        "search_limit",
        "restore_attempts",
        "restore_interval_ms",
        "virtualize",
        "virtualize_threshold",
        "virtualize_delay_ms",
        "row_height",
        "overscan",
        "load_threshold",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unusable values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check the size before reading so a huge file is never loaded
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            window_size = config.window_size,
            virtualize = config.virtualize,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be at least 1".into()));
        }
        if self.search_limit <= 0 {
            return Err(ConfigError::Invalid("search_limit must be at least 1".into()));
        }
        if !(self.row_height.is_finite() && self.row_height > 0.0) {
            return Err(ConfigError::Invalid("row_height must be a positive number".into()));
        }
        Ok(())
    }

    /// Tunables for feed views.
    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            window: WindowConfig {
                size: self.window_size,
                cooldown: Duration::from_millis(self.load_cooldown_ms),
                settle_delay: Duration::from_millis(self.settle_delay_ms),
            },
            debounce: Duration::from_millis(self.search_debounce_ms),
            restore: RestoreConfig {
                max_attempts: self.restore_attempts,
                interval: Duration::from_millis(self.restore_interval_ms),
            },
            virtualize: self.virtualize,
            virtualize_threshold: self.virtualize_threshold,
            virtualize_delay: Duration::from_millis(self.virtualize_delay_ms),
            list: VirtualList {
                row_height: self.row_height,
                overscan: self.overscan,
                load_threshold: self.load_threshold,
            },
            layout: ListLayout {
                row_height: self.row_height,
                sentinel_height: SENTINEL_HEIGHT,
            },
            trigger: TriggerConfig::default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_size, 20);
        assert_eq!(config.load_cooldown_ms, 1000);
        assert_eq!(config.settle_delay_ms, 300);
        assert_eq!(config.search_debounce_ms, 400);
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.restore_attempts, 30);
        assert!(config.virtualize);
    }

    #[test]
    fn test_defaults_match_feed_defaults() {
        assert_eq!(Config::default().feed_settings(), FeedSettings::default());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/freshfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("freshfeed_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  \n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::parse("window_size = 50\nvirtualize = false\n").unwrap();
        assert_eq!(config.window_size, 50);
        assert!(!config.virtualize);
        assert_eq!(config.load_cooldown_ms, 1000);

        let settings = config.feed_settings();
        assert_eq!(settings.window.size, 50);
        assert_eq!(settings.window.cooldown, Duration::from_millis(1000));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(matches!(
            Config::parse("window_size = \"twenty\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = Config::parse("window_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("window_size"));
    }

    #[test]
    fn test_nonpositive_row_height_rejected() {
        assert!(matches!(
            Config::parse("row_height = 0.0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("window_size = 10\ntheme = \"dark\"\n").unwrap();
        assert_eq!(config.window_size, 10);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("freshfeed_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
