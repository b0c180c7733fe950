//! Kagami: an incremental gallery catalog mirror
//!
//! This crate walks a remote catalog's paginated listing newest-first from
//! the most recently stored record, fetches full metadata through the
//! batched JSON API, and upserts everything idempotently into SQLite so a
//! rerun always resumes where the last one stopped.

pub mod catalog;
pub mod config;
pub mod report;
pub mod session;
pub mod storage;
pub mod sync;

use thiserror::Error;

/// Main error type for Kagami operations
#[derive(Debug, Error)]
pub enum KagamiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Ban cooldown did not clear after {0} rounds")]
    BanPersisted(u32),

    #[error("Listing produced non-numeric gid {0:?}")]
    InvalidGid(String),

    #[error("Invalid posted timestamp {value:?} for gid {gid}")]
    InvalidPosted { gid: i64, value: String },

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Session-cookie errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to read cookie file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse cookie file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Required cookie {0} not found")]
    MissingCookie(&'static str),

    #[error("No session cookies available for {0}; provide --cookie-file or set COOKIE")]
    MissingSession(String),
}

/// Result type alias for Kagami operations
pub type Result<T> = std::result::Result<T, KagamiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{CatalogClient, GalleryMetadata, PageEntry, Site};
pub use config::Config;
pub use storage::{CatalogStore, SqliteStore};
pub use sync::SyncEngine;
