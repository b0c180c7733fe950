//! SQLite storage implementation
//!
//! One connection is shared for the whole run; statements are prepared per
//! call and released when they fall out of scope. The sync loop is strictly
//! sequential, so no locking wraps the connection.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::storage::schema::initialize_schema;
use crate::storage::{CatalogStore, GalleryRow, StoreError, StoreResult, TorrentRow};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (useful for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn find_tag(&self, name: &str) -> StoreResult<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM tag WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    fn insert_tag(&mut self, name: &str) -> StoreResult<i64> {
        self.conn
            .execute("INSERT INTO tag (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl CatalogStore for SqliteStore {
    fn upsert_gallery(&mut self, row: &GalleryRow) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO gallery (gid, token, archiver_key, title, title_jpn, category, thumb,
                                  uploader, posted, filecount, filesize, expunged, rating,
                                  torrentcount, root_gid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(gid) DO UPDATE SET
                token = excluded.token,
                archiver_key = excluded.archiver_key,
                title = excluded.title,
                title_jpn = excluded.title_jpn,
                category = excluded.category,
                thumb = excluded.thumb,
                uploader = excluded.uploader,
                posted = excluded.posted,
                filecount = excluded.filecount,
                filesize = excluded.filesize,
                expunged = excluded.expunged,
                rating = excluded.rating,
                torrentcount = excluded.torrentcount,
                root_gid = excluded.root_gid",
            params![
                row.gid,
                row.token,
                row.archiver_key,
                row.title,
                row.title_jpn,
                row.category,
                row.thumb,
                row.uploader,
                row.posted,
                row.filecount,
                row.filesize,
                row.expunged as i64,
                row.rating,
                row.torrentcount,
                row.root_gid,
            ],
        )?;
        Ok(())
    }

    fn insert_torrent(&mut self, row: &TorrentRow) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO torrent (gid, hash, name, added, fsize, uploader)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![row.gid, row.hash, row.name, row.added, row.fsize, row.uploader],
        )?;
        Ok(())
    }

    fn tag_gallery(&mut self, gid: i64, name: &str) -> StoreResult<()> {
        let tag_id = match self.find_tag(name)? {
            Some(id) => id,
            None => match self.insert_tag(name) {
                Ok(id) => id,
                // Lost a race with another insert of the same name; the row
                // exists now, so look it up again.
                Err(StoreError::Duplicate(_)) => self
                    .find_tag(name)?
                    .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?,
                Err(e) => return Err(e),
            },
        };

        self.conn.execute(
            "INSERT OR IGNORE INTO gallery_tag (gid, tag_id) VALUES (?1, ?2)",
            params![gid, tag_id],
        )?;
        Ok(())
    }

    fn last_gid(&self) -> StoreResult<Option<i64>> {
        let gid = self
            .conn
            .query_row("SELECT gid FROM gallery ORDER BY gid DESC LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(gid)
    }

    fn newest_posted(&self) -> StoreResult<Option<i64>> {
        let posted = self
            .conn
            .query_row(
                "SELECT posted FROM gallery ORDER BY posted DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(posted)
    }

    fn gid_at_or_before(&self, posted_threshold: i64) -> StoreResult<Option<i64>> {
        let gid = self
            .conn
            .query_row(
                "SELECT gid FROM gallery WHERE posted <= ?1 ORDER BY posted DESC LIMIT 1",
                params![posted_threshold],
                |row| row.get(0),
            )
            .optional()?;
        Ok(gid)
    }

    fn count_galleries(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM gallery", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn newest_gallery(&self) -> StoreResult<Option<(i64, i64)>> {
        let newest = self
            .conn
            .query_row(
                "SELECT gid, posted FROM gallery ORDER BY posted DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(newest)
    }

    fn get_gallery(&self, gid: i64) -> StoreResult<Option<GalleryRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT gid, token, archiver_key, title, title_jpn, category, thumb, uploader,
                        posted, filecount, filesize, expunged, rating, torrentcount, root_gid
                 FROM gallery WHERE gid = ?1",
                params![gid],
                |row| {
                    Ok(GalleryRow {
                        gid: row.get(0)?,
                        token: row.get(1)?,
                        archiver_key: row.get(2)?,
                        title: row.get(3)?,
                        title_jpn: row.get(4)?,
                        category: row.get(5)?,
                        thumb: row.get(6)?,
                        uploader: row.get(7)?,
                        posted: row.get(8)?,
                        filecount: row.get(9)?,
                        filesize: row.get(10)?,
                        expunged: row.get::<_, i64>(11)? != 0,
                        rating: row.get(12)?,
                        torrentcount: row.get(13)?,
                        root_gid: row.get(14)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn count_torrents(&self, gid: i64) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM torrent WHERE gid = ?1",
            params![gid],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn tags_for(&self, gid: i64) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM tag t
             JOIN gallery_tag gt ON gt.tag_id = t.id
             WHERE gt.gid = ?1
             ORDER BY t.name",
        )?;

        let tags = stmt
            .query_map(params![gid], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tags)
    }
}
