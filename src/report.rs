//! Final run report
//!
//! After a clean run the mirror prints how much it holds and how fresh it
//! is: total stored galleries, the newest gallery id, and the cutoff
//! timestamp of the newest record.

use chrono::{LocalResult, TimeZone, Utc};

use crate::storage::{CatalogStore, StoreResult};

/// Summary of the mirrored catalog printed after a clean run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub total_entries: u64,
    pub last_gid: i64,
    pub cutoff: String,
}

/// Loads the report values from the store.
///
/// Returns `None` for an empty store, which has nothing to report.
pub fn load_report(store: &dyn CatalogStore) -> StoreResult<Option<SyncReport>> {
    let total_entries = store.count_galleries()?;

    let Some((last_gid, last_posted)) = store.newest_gallery()? else {
        return Ok(None);
    };

    Ok(Some(SyncReport {
        total_entries,
        last_gid,
        cutoff: format_cutoff(last_posted),
    }))
}

/// Formats a posted timestamp as the report cutoff, e.g.
/// `2024-01-15 10:00 UTC+0`.
pub fn format_cutoff(posted: i64) -> String {
    match Utc.timestamp_opt(posted, 0) {
        LocalResult::Single(datetime) => {
            format!("{} UTC+0", datetime.format("%Y-%m-%d %H:%M"))
        }
        _ => format!("epoch {} UTC+0", posted),
    }
}

/// Prints the report to stdout.
pub fn print_report(report: &SyncReport) {
    println!("\nFINAL REPORT:");
    println!("Total entries in database: {}", report.total_entries);
    println!("Last posted ID: {}", report.last_gid);
    println!("Cutoff time: {}", report.cutoff);
}
