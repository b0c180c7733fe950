//! Remote catalog access
//!
//! Everything that talks to the remote lives here:
//! - the listing page walker with retry and ban-cooldown handling
//! - extraction of (gid, token, posted) triples from listing markup
//! - the batched metadata API client

mod ban;
mod client;
mod listing;
mod metadata;

pub use ban::{detect_ban, run_cooldown, BAN_SAFETY_MARGIN_SECS};
pub use client::{CatalogClient, Site, MAX_BAN_ROUNDS};
pub use listing::{ListingExtractor, PageEntry, RegexExtractor};
pub use metadata::{GalleryMetadata, MetadataResponse, TorrentInfo, BATCH_SIZE};
