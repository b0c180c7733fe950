use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for Kagami
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Polite delay between successive page fetches, in seconds.
    ///
    /// Distinct from the ban cooldown, which is dictated by the remote.
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,

    /// Retry budget for transient page-fetch and API failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            cooldown: default_cooldown(),
            retry_count: default_retry_count(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("kagami.db")
}

fn default_cooldown() -> u64 {
    3
}

fn default_retry_count() -> u32 {
    3
}
