//! Listing page extraction
//!
//! A listing page is scraped for (gid, token, posted) triples. The page is
//! newest-first and the sync loop advances its cursor to the first entry,
//! so extraction must preserve document order.

use regex_lite::Regex;
use std::collections::HashSet;

/// One entry scraped from a listing page: the gallery id, its access token,
/// and the posted timestamp string shown in the listing.
///
/// Entries live only long enough to drive a metadata fetch; they are never
/// persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub gid: String,
    pub token: String,
    pub posted: String,
}

/// Strategy for pulling `PageEntry` triples out of a listing document.
///
/// Implementations must return entries in document order and deduplicate by
/// gid, keeping the first occurrence.
pub trait ListingExtractor: Send + Sync {
    fn extract(&self, body: &str) -> Vec<PageEntry>;
}

/// Default extractor matching gallery links in the listing markup.
pub struct RegexExtractor {
    pattern: Regex,
}

impl RegexExtractor {
    pub fn new() -> Self {
        // The gid/token pair of a gallery link, followed by the posted
        // timestamp cell.
        let pattern =
            Regex::new(r"gid=(\d+).*?t=([0-9a-f]{10}).*?>(\d{4}-\d{2}-\d{2}\s\d{2}:\d{2})<")
                .expect("listing pattern is valid");
        Self { pattern }
    }
}

impl Default for RegexExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingExtractor for RegexExtractor {
    fn extract(&self, body: &str) -> Vec<PageEntry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for caps in self.pattern.captures_iter(body) {
            let gid = caps[1].to_string();
            // A gid can repeat across a pagination boundary artifact; the
            // first occurrence wins.
            if !seen.insert(gid.clone()) {
                continue;
            }
            entries.push(PageEntry {
                gid,
                token: caps[2].to_string(),
                posted: caps[3].to_string(),
            });
        }

        entries
    }
}
