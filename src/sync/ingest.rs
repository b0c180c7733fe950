//! Per-record ingestion
//!
//! Turns one metadata record into idempotent gallery, torrent, and tag
//! writes. Torrent and tag failures are logged and skipped so one bad
//! sub-entity cannot take down the rest of the record; no transaction spans
//! a record, and a later run repairs any partial write because every
//! operation is independently idempotent.

use crate::catalog::GalleryMetadata;
use crate::storage::{CatalogStore, GalleryRow, TorrentRow};
use crate::{KagamiError, Result};

/// Parses a numeric field the remote serves as text, degrading to zero on
/// failure instead of rejecting the record.
fn lenient_i64(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

/// Ingests one gallery record.
///
/// `posted` is the ordering key and cursor threshold; a record without a
/// parseable value cannot be placed in the mirror and is rejected whole.
/// Every other numeric field parses leniently.
pub fn ingest_record(store: &mut dyn CatalogStore, meta: &GalleryMetadata) -> Result<()> {
    let posted: i64 = meta
        .posted
        .parse()
        .map_err(|_| KagamiError::InvalidPosted {
            gid: meta.gid,
            value: meta.posted.clone(),
        })?;

    let row = GalleryRow {
        gid: meta.gid,
        token: meta.token.clone(),
        archiver_key: meta.archiver_key.clone(),
        title: meta.title.clone(),
        title_jpn: meta.title_jpn.clone(),
        category: meta.category.clone(),
        thumb: meta.thumb.clone(),
        uploader: meta.uploader.clone(),
        posted,
        filecount: lenient_i64(&meta.filecount),
        filesize: meta.filesize,
        expunged: meta.expunged,
        rating: meta.rating.clone(),
        torrentcount: lenient_i64(&meta.torrentcount),
        root_gid: meta.parent_gid.as_deref().map(lenient_i64).unwrap_or(0),
    };
    store.upsert_gallery(&row)?;
    tracing::debug!("Upserted gallery {}", meta.gid);

    for torrent in &meta.torrents {
        let row = TorrentRow {
            gid: meta.gid,
            hash: torrent.hash.clone(),
            name: torrent.name.clone(),
            added: torrent.added.clone(),
            fsize: torrent.fsize.clone(),
            uploader: meta.uploader.clone(),
        };
        if let Err(e) = store.insert_torrent(&row) {
            tracing::error!(
                "Failed to save torrent {} for gallery {}: {}",
                torrent.hash,
                meta.gid,
                e
            );
        }
    }

    for tag in &meta.tags {
        if let Err(e) = store.tag_gallery(meta.gid, tag) {
            tracing::error!("Failed to tag gallery {} with {:?}: {}", meta.gid, tag, e);
        }
    }

    Ok(())
}
