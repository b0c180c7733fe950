//! Rate-limit ban detection and cooldown
//!
//! When the remote rate-limits a client it serves a plain page stating how
//! long the ban lasts instead of the listing. The notice is parsed for its
//! duration and the whole sync pauses for that long; this is a deliberate
//! stop-the-world pause, not a per-request backoff.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::Duration;

/// Seconds added on top of the announced ban duration so the next fetch
/// cannot race the remote unban boundary.
pub const BAN_SAFETY_MARGIN_SECS: u64 = 10;

static BAN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)The ban expires in\s*(?:(\d+)\s*days?)?\s*(?:(\d+)\s*hours?)?\s*(?:(\d+)\s*minutes?)?\s*(?:(?:and\s*)?(\d+)\s*seconds?)?",
    )
    .expect("ban pattern is valid")
});

/// Scans a page body for a ban notice.
///
/// Each of the day/hour/minute/second components is independently optional
/// and counts as zero when absent. Returns the total wait in seconds plus
/// [`BAN_SAFETY_MARGIN_SECS`], or `None` when the body carries no notice or
/// the announced duration is zero.
pub fn detect_ban(body: &str) -> Option<u64> {
    let caps = BAN_PATTERN.captures(body)?;

    let component = |index: usize| -> u64 {
        caps.get(index)
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0)
    };

    let total =
        component(1) * 86_400 + component(2) * 3_600 + component(3) * 60 + component(4);
    if total == 0 {
        return None;
    }

    Some(total + BAN_SAFETY_MARGIN_SECS)
}

/// Blocks the calling task for the full cooldown.
///
/// Nothing else runs in the meantime; the sync loop is strictly sequential
/// and the only way out of the pause short of completion is process
/// termination.
pub async fn run_cooldown(wait_secs: u64) {
    tracing::warn!("Ban cooldown: pausing all fetches for {}s", wait_secs);
    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
    tracing::info!("Ban cooldown of {}s complete, resuming", wait_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_notice() {
        let body = "Your IP address has been temporarily banned. \
                    The ban expires in 1 day 2 hours 3 minutes and 4 seconds";
        assert_eq!(detect_ban(body), Some(86_400 + 7_200 + 180 + 4 + 10));
    }

    #[test]
    fn test_partial_components() {
        assert_eq!(detect_ban("The ban expires in 3 minutes"), Some(180 + 10));
        assert_eq!(
            detect_ban("The ban expires in 2 hours and 30 seconds"),
            Some(7_200 + 30 + 10)
        );
        assert_eq!(detect_ban("The ban expires in 45 seconds"), Some(45 + 10));
    }

    #[test]
    fn test_plural_and_singular_units() {
        assert_eq!(detect_ban("The ban expires in 1 hour"), Some(3_600 + 10));
        assert_eq!(detect_ban("The ban expires in 2 days"), Some(172_800 + 10));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(detect_ban("THE BAN EXPIRES IN 1 MINUTE"), Some(60 + 10));
    }

    #[test]
    fn test_no_notice() {
        assert_eq!(detect_ban("<html><body>regular listing page</body></html>"), None);
    }

    #[test]
    fn test_notice_without_duration() {
        // The phrase alone, with no components, is not a ban.
        assert_eq!(detect_ban("The ban expires in "), None);
    }
}
