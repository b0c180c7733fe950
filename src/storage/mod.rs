//! Storage module for the mirrored catalog
//!
//! SQLite persistence for galleries, their torrents, and tag links, plus
//! the cursor and report queries the sync loop depends on. Every write is
//! idempotent: re-ingesting a record refreshes its mutable fields without
//! creating duplicate rows.

mod schema;
mod sqlite;

pub use schema::initialize_schema;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique-key insert collided with an existing row.
    ///
    /// Classified from the SQLite error code so callers can treat expected
    /// idempotent re-inserts as non-errors without matching message text.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(inner, ref message) = e {
            if inner.code == rusqlite::ErrorCode::ConstraintViolation {
                let detail = message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string());
                return StoreError::Duplicate(detail);
            }
        }
        StoreError::Sqlite(e)
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A gallery row as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRow {
    pub gid: i64,
    pub token: String,
    pub archiver_key: String,
    pub title: String,
    pub title_jpn: String,
    pub category: String,
    pub thumb: String,
    pub uploader: String,
    pub posted: i64,
    pub filecount: i64,
    pub filesize: i64,
    pub expunged: bool,
    pub rating: String,
    pub torrentcount: i64,
    pub root_gid: i64,
}

/// A torrent row, always scoped under its parent gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentRow {
    pub gid: i64,
    pub hash: String,
    pub name: String,
    pub added: String,
    pub fsize: String,
    pub uploader: String,
}

/// Storage operations the sync loop and the report depend on.
pub trait CatalogStore {
    /// Inserts a gallery or refreshes every mutable field of the existing
    /// row. The natural key `gid` is never rewritten.
    fn upsert_gallery(&mut self, row: &GalleryRow) -> StoreResult<()>;

    /// Records a torrent under its gallery; a duplicate (gid, hash) pair is
    /// ignored, not merged.
    fn insert_torrent(&mut self, row: &TorrentRow) -> StoreResult<()>;

    /// Ensures the named tag exists and links it to the gallery. Both the
    /// tag insert and the link are idempotent.
    fn tag_gallery(&mut self, gid: i64, name: &str) -> StoreResult<()>;

    /// Newest stored gallery id, or `None` for an empty store.
    fn last_gid(&self) -> StoreResult<Option<i64>>;

    /// Newest stored posted timestamp.
    fn newest_posted(&self) -> StoreResult<Option<i64>>;

    /// Newest gallery id whose posted timestamp is at or before the
    /// threshold.
    fn gid_at_or_before(&self, posted_threshold: i64) -> StoreResult<Option<i64>>;

    /// Total stored gallery count.
    fn count_galleries(&self) -> StoreResult<u64>;

    /// (gid, posted) of the newest stored gallery by posted time.
    fn newest_gallery(&self) -> StoreResult<Option<(i64, i64)>>;

    /// Full row for one gallery.
    fn get_gallery(&self, gid: i64) -> StoreResult<Option<GalleryRow>>;

    /// Number of torrents stored under one gallery.
    fn count_torrents(&self, gid: i64) -> StoreResult<u64>;

    /// Tag names linked to one gallery, sorted.
    fn tags_for(&self, gid: i64) -> StoreResult<Vec<String>>;
}
