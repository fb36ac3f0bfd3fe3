use serde::{Deserialize, Serialize};

const IN_MEMORY_PATH: &str = ":memory:";

fn default_enforce_foreign_keys() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// SQLite execution client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    /// Turn on `PRAGMA foreign_keys` when the connection opens
    #[serde(default = "default_enforce_foreign_keys")]
    pub enforce_foreign_keys: bool,
    /// How long a statement waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl SqliteConfig {
    /// Create a new SQLite config for the given path
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            enforce_foreign_keys: default_enforce_foreign_keys(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY_PATH)
    }

    pub fn with_foreign_keys(mut self, enforce: bool) -> Self {
        self.enforce_foreign_keys = enforce;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_uses_defaults() {
        let config = SqliteConfig::in_memory();
        assert!(config.is_in_memory());
        assert!(config.enforce_foreign_keys);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn builder_overrides_foreign_keys() {
        let config = SqliteConfig::new("ads.sqlite").with_foreign_keys(false);
        assert!(!config.is_in_memory());
        assert!(!config.enforce_foreign_keys);
    }
}
