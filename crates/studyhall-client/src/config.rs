//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client runs with zero configuration.

use std::path::PathBuf;

use studyhall_shared::constants::{DEFAULT_CHANGE_FEED_CAPACITY, GROUP_FEED_WINDOW};
use studyhall_store::Database;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// SQLite database file.
    /// Env: `STUDYHALL_DB_PATH`
    /// Default: the platform data directory.
    pub database_path: Option<PathBuf>,

    /// How many recent group messages the feed mirror holds.
    /// Env: `FEED_WINDOW`
    /// Default: `50`
    pub feed_window: usize,

    /// Buffered change notifications per subscriber before it lags.
    /// Env: `CHANGE_FEED_CAPACITY`
    /// Default: `256`
    pub change_feed_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            feed_window: GROUP_FEED_WINDOW,
            change_feed_capacity: DEFAULT_CHANGE_FEED_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("STUDYHALL_DB_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(value) = std::env::var("FEED_WINDOW") {
            if let Some(window) = parse_positive("FEED_WINDOW", &value) {
                config.feed_window = window;
            }
        }

        if let Ok(value) = std::env::var("CHANGE_FEED_CAPACITY") {
            if let Some(capacity) = parse_positive("CHANGE_FEED_CAPACITY", &value) {
                config.change_feed_capacity = capacity;
            }
        }

        config
    }

    /// Open the configured database, or the default per-user one.
    pub fn open_database(&self) -> studyhall_store::Result<Database> {
        match &self.database_path {
            Some(path) => Database::open_at(path, self.change_feed_capacity),
            None => Database::new(self.change_feed_capacity),
        }
    }
}

fn parse_positive(name: &str, value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(var = name, value = %value, "Invalid {name}, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.feed_window, 50);
        assert_eq!(config.change_feed_capacity, 256);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("FEED_WINDOW", " 20 "), Some(20));
        assert_eq!(parse_positive("FEED_WINDOW", "0"), None);
        assert_eq!(parse_positive("FEED_WINDOW", "-3"), None);
        assert_eq!(parse_positive("FEED_WINDOW", "lots"), None);
    }

    #[test]
    fn test_open_database_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            database_path: Some(dir.path().join("nested").join("test.db")),
            ..ClientConfig::default()
        };

        let db = config.open_database().unwrap();
        assert!(db.path().is_some());
        assert!(dir.path().join("nested").join("test.db").exists());
    }
}
