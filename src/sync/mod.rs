//! Sync controller
//!
//! The resumable crawl loop: determine the start cursor, walk listing
//! pages newest-first, fetch metadata in batches, ingest, and advance the
//! cursor to the newest entry of each page. The loop is strictly
//! sequential: one page must finish (or exhaust its retries) before the
//! next fetch starts, so the run stays within a single rate-limited
//! remote identity and cursor advancement cannot interleave.

mod ingest;

pub use ingest::ingest_record;

use std::time::Duration;

use crate::catalog::CatalogClient;
use crate::storage::CatalogStore;
use crate::{KagamiError, Result};

/// Counters from a completed sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Listing pages walked before catching up
    pub pages: u64,
    /// Page entries seen across all pages
    pub listed_entries: u64,
    /// Metadata records successfully ingested
    pub ingested_records: u64,
}

/// Drives the crawl-and-ingest loop against one catalog and one store.
pub struct SyncEngine<S> {
    client: CatalogClient,
    store: S,
    cooldown: Duration,
    offset_hours: i64,
}

impl<S: CatalogStore> SyncEngine<S> {
    /// # Arguments
    ///
    /// * `client` - Catalog access (listing and metadata API)
    /// * `store` - Entity store to mirror into
    /// * `cooldown_secs` - Polite delay before every page fetch
    /// * `offset_hours` - Hours to rewind the start cursor, 0 to resume
    ///   from the newest stored id
    pub fn new(client: CatalogClient, store: S, cooldown_secs: u64, offset_hours: i64) -> Self {
        Self {
            client,
            store,
            cooldown: Duration::from_secs(cooldown_secs),
            offset_hours,
        }
    }

    /// The underlying store, for post-run reporting.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Picks the cursor to resume from.
    ///
    /// With a positive hour offset the start is rewound to the newest
    /// gallery posted at least that many hours before the newest stored
    /// one; when nothing qualifies, or without an offset, the newest
    /// stored id is used (0 for an empty store, which asks the listing
    /// for its first page).
    fn determine_start(&self) -> Result<i64> {
        if self.offset_hours > 0 {
            if let Some(newest) = self.store.newest_posted()? {
                let threshold = newest - self.offset_hours * 3600;
                if let Some(gid) = self.store.gid_at_or_before(threshold)? {
                    tracing::info!(
                        "Rewinding {}h: starting from gid {}",
                        self.offset_hours,
                        gid
                    );
                    return Ok(gid);
                }
            }
        }

        let gid = self.store.last_gid()?.unwrap_or(0);
        tracing::info!("Starting from last stored gid {}", gid);
        Ok(gid)
    }

    /// Runs the sync loop to completion.
    ///
    /// Terminates cleanly when a listing page yields zero entries (the
    /// mirror has caught up to the present). A page fetch that exhausts
    /// its retry budget aborts the run with the error rather than looping
    /// on a stale cursor.
    pub async fn run(&mut self) -> Result<SyncOutcome> {
        let mut cursor = self.determine_start()?;
        let mut outcome = SyncOutcome::default();

        loop {
            // Polite fixed delay between page fetches; distinct from the
            // ban cooldown.
            tokio::time::sleep(self.cooldown).await;

            let entries = self.client.fetch_listing(cursor).await?;
            if entries.is_empty() {
                tracing::info!("No entries beyond gid {}; mirror is caught up", cursor);
                break;
            }

            outcome.pages += 1;
            outcome.listed_entries += entries.len() as u64;

            let records = self.client.fetch_metadata(&entries).await;
            let fetched = records.len();

            let mut stored = 0u64;
            for record in &records {
                match ingest_record(&mut self.store, record) {
                    Ok(()) => stored += 1,
                    Err(e) => tracing::error!("Failed to ingest gallery record: {}", e),
                }
            }
            outcome.ingested_records += stored;

            // The listing is newest-first, so the first entry is the newest
            // this page saw; the next fetch asks for entries before it.
            let newest = &entries[0];
            tracing::info!(
                "Page at cursor {}: {} listed, {} fetched, {} stored; newest entry {} ({})",
                cursor,
                entries.len(),
                fetched,
                stored,
                newest.gid,
                newest.posted
            );

            cursor = newest
                .gid
                .parse()
                .map_err(|_| KagamiError::InvalidGid(newest.gid.clone()))?;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Site;
    use crate::storage::{GalleryRow, SqliteStore};

    fn engine_with(rows: &[(i64, i64)], offset_hours: i64) -> SyncEngine<SqliteStore> {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for &(gid, posted) in rows {
            store
                .upsert_gallery(&GalleryRow {
                    gid,
                    token: "aaaaaaaaaa".to_string(),
                    archiver_key: String::new(),
                    title: String::new(),
                    title_jpn: String::new(),
                    category: String::new(),
                    thumb: String::new(),
                    uploader: String::new(),
                    posted,
                    filecount: 0,
                    filesize: 0,
                    expunged: false,
                    rating: String::new(),
                    torrentcount: 0,
                    root_gid: 0,
                })
                .unwrap();
        }

        let client = CatalogClient::for_site(Site::EHentai, None, 1).unwrap();
        SyncEngine::new(client, store, 0, offset_hours)
    }

    #[test]
    fn test_start_from_empty_store() {
        let engine = engine_with(&[], 0);
        assert_eq!(engine.determine_start().unwrap(), 0);
    }

    #[test]
    fn test_start_from_last_gid() {
        let engine = engine_with(&[(1, 100), (2, 200), (3, 300)], 0);
        assert_eq!(engine.determine_start().unwrap(), 3);
    }

    #[test]
    fn test_offset_selects_entry_at_or_below_threshold() {
        // Rows an hour apart; a 1h offset from the newest (posted 7200)
        // gives threshold 3600, selecting gid 2.
        let engine = engine_with(&[(1, 0), (2, 3600), (3, 7200)], 1);
        assert_eq!(engine.determine_start().unwrap(), 2);
    }

    #[test]
    fn test_offset_with_nothing_qualifying_falls_back() {
        // A 10h offset puts the threshold before every stored row, so the
        // start falls back to the globally newest id.
        let engine = engine_with(&[(1, 7000), (2, 7100), (3, 7200)], 10);
        assert_eq!(engine.determine_start().unwrap(), 3);
    }

    #[test]
    fn test_offset_on_empty_store_falls_back() {
        let engine = engine_with(&[], 5);
        assert_eq!(engine.determine_start().unwrap(), 0);
    }
}
