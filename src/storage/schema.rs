//! Database schema definitions

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Mirrored gallery records, keyed by the remote's stable gallery id
CREATE TABLE IF NOT EXISTS gallery (
    gid INTEGER PRIMARY KEY,
    token TEXT NOT NULL,
    archiver_key TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    title_jpn TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    thumb TEXT NOT NULL DEFAULT '',
    uploader TEXT NOT NULL DEFAULT '',
    posted INTEGER NOT NULL,
    filecount INTEGER NOT NULL DEFAULT 0,
    filesize INTEGER NOT NULL DEFAULT 0,
    expunged INTEGER NOT NULL DEFAULT 0,
    rating TEXT NOT NULL DEFAULT '',
    torrentcount INTEGER NOT NULL DEFAULT 0,
    root_gid INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_gallery_posted ON gallery(posted);

-- Torrent bundles attached to a gallery
CREATE TABLE IF NOT EXISTS torrent (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    gid INTEGER NOT NULL REFERENCES gallery(gid),
    hash TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    added TEXT NOT NULL DEFAULT '',
    fsize TEXT NOT NULL DEFAULT '',
    uploader TEXT NOT NULL DEFAULT '',
    UNIQUE(gid, hash)
);

CREATE INDEX IF NOT EXISTS idx_torrent_gid ON torrent(gid);

-- Tag vocabulary, created lazily on first observation
CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Many-to-many gallery/tag association
CREATE TABLE IF NOT EXISTS gallery_tag (
    gid INTEGER NOT NULL REFERENCES gallery(gid),
    tag_id INTEGER NOT NULL REFERENCES tag(id),
    UNIQUE(gid, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_gallery_tag_gid ON gallery_tag(gid);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
