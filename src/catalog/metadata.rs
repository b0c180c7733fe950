//! Batched metadata API access
//!
//! The listing only yields (gid, token) pairs; full records come from the
//! JSON API, which accepts up to 25 pairs per call. Chunks are independent:
//! one chunk failing or coming back empty never blocks the others, its
//! entries are simply picked up again by a later run.

use serde::Deserialize;
use serde_json::json;

use crate::catalog::client::{CatalogClient, RETRY_DELAY};
use crate::catalog::listing::PageEntry;
use crate::{KagamiError, Result};

/// Fixed number of (gid, token) pairs submitted per metadata API request.
pub const BATCH_SIZE: usize = 25;

/// One distributable bundle attached to a gallery.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    #[serde(default)]
    pub added: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tsize: String,
    #[serde(default)]
    pub fsize: String,
}

/// One gallery record as returned by the metadata API.
///
/// The remote serves several numeric fields as strings (`posted`,
/// `filecount`, `torrentcount`, `parent_gid`); ingestion decides how
/// strictly each one is parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryMetadata {
    pub gid: i64,
    pub token: String,
    #[serde(default)]
    pub archiver_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_jpn: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub uploader: String,
    pub posted: String,
    #[serde(default)]
    pub filecount: String,
    #[serde(default)]
    pub filesize: i64,
    #[serde(default)]
    pub expunged: bool,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub torrentcount: String,
    #[serde(default)]
    pub torrents: Vec<TorrentInfo>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parent_gid: Option<String>,
}

/// Envelope of the metadata API response.
#[derive(Debug, Deserialize)]
pub struct MetadataResponse {
    pub gmetadata: Vec<GalleryMetadata>,
}

impl CatalogClient {
    /// Fetches full metadata for the given page entries.
    ///
    /// Entries are partitioned into [`BATCH_SIZE`] chunks, one API call
    /// each. A chunk that exhausts its retries is dropped with a log
    /// record, as is a chunk the remote answers with zero records. Record
    /// order follows the remote response within each chunk and must not be
    /// assumed to match the input order.
    pub async fn fetch_metadata(&self, entries: &[PageEntry]) -> Vec<GalleryMetadata> {
        let mut records = Vec::new();

        for (index, chunk) in entries.chunks(BATCH_SIZE).enumerate() {
            match self.fetch_batch(chunk).await {
                Ok(batch) if batch.is_empty() => {
                    tracing::error!("Metadata batch {} returned no records", index);
                }
                Ok(batch) => records.extend(batch),
                Err(e) => {
                    tracing::error!(
                        "Metadata batch {} failed after {} attempts: {}",
                        index,
                        self.retry_count,
                        e
                    );
                }
            }
        }

        records
    }

    /// One API call for one chunk, retried on transport, status, and decode
    /// failure up to the retry budget.
    async fn fetch_batch(&self, chunk: &[PageEntry]) -> Result<Vec<GalleryMetadata>> {
        let gidlist: Vec<serde_json::Value> = chunk
            .iter()
            .filter_map(|entry| match entry.gid.parse::<i64>() {
                Ok(gid) => Some(json!([gid, entry.token])),
                Err(e) => {
                    tracing::error!("Skipping entry with non-numeric gid {:?}: {}", entry.gid, e);
                    None
                }
            })
            .collect();

        let payload = json!({
            "method": "gdata",
            "gidlist": gidlist,
            "namespace": 1,
        });

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_fetch_batch(&payload).await {
                Ok(response) => return Ok(response.gmetadata),
                Err(e) if attempt < self.retry_count => {
                    tracing::error!(
                        "Metadata API attempt {}/{} failed: {}",
                        attempt,
                        self.retry_count,
                        e
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_fetch_batch(&self, payload: &serde_json::Value) -> Result<MetadataResponse> {
        let response = self
            .http
            .post(&self.api_endpoint)
            .header("Accept", "application/json;q=0.9,*/*")
            .header("Accept-Language", "en-US;q=0.9,en;q=0.8")
            .header("DNT", "1")
            .json(payload)
            .send()
            .await
            .map_err(|source| KagamiError::Http {
                url: self.api_endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KagamiError::Status {
                url: self.api_endpoint.clone(),
                status: status.as_u16(),
            });
        }

        response
            .json::<MetadataResponse>()
            .await
            .map_err(|source| KagamiError::Http {
                url: self.api_endpoint.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_decodes_with_sparse_fields() {
        let raw = r#"{
            "gmetadata": [{
                "gid": 500,
                "token": "aaaaaaaaaa",
                "title": "Example",
                "posted": "1705312800",
                "tags": ["artist:someone", "language:english"]
            }]
        }"#;

        let response: MetadataResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.gmetadata.len(), 1);

        let record = &response.gmetadata[0];
        assert_eq!(record.gid, 500);
        assert_eq!(record.posted, "1705312800");
        assert_eq!(record.filecount, "");
        assert!(record.torrents.is_empty());
        assert_eq!(record.tags.len(), 2);
        assert!(record.parent_gid.is_none());
    }

    #[test]
    fn test_chunk_partitioning() {
        let entries: Vec<PageEntry> = (0..57)
            .map(|i| PageEntry {
                gid: i.to_string(),
                token: "aaaaaaaaaa".to_string(),
                posted: "2024-01-15 12:00".to_string(),
            })
            .collect();

        let sizes: Vec<usize> = entries.chunks(BATCH_SIZE).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![25, 25, 7]);
    }
}
