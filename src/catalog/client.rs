//! Catalog HTTP client
//!
//! This module builds the browser-like HTTP client and implements the
//! listing page walker:
//! - GET one listing page for a cursor
//! - retry transient failures with a fixed delay
//! - run the ban monitor over every body before parsing
//! - extract ordered, deduplicated page entries

use reqwest::Client;
use std::time::Duration;

use crate::catalog::ban::{detect_ban, run_cooldown};
use crate::catalog::listing::{ListingExtractor, PageEntry, RegexExtractor};
use crate::{KagamiError, Result};

/// Bounded number of cooldown-and-refetch rounds for a single cursor before
/// the fetch is abandoned. A remote that keeps answering with ban notices
/// after this many cooldowns is not going to unban us this run.
pub const MAX_BAN_ROUNDS: u32 = 5;

/// Fixed delay between retry attempts for transient failures.
pub(crate) const RETRY_DELAY: Duration = Duration::from_secs(1);

/// The listing only renders for browser user agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/75.0.3770.142 Safari/537.36";

/// Target catalog site
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Site {
    /// Open catalog; session cookies optional
    #[value(name = "e-hentai")]
    EHentai,
    /// Restricted catalog; session cookies required
    #[value(name = "exhentai")]
    ExHentai,
}

impl Site {
    pub fn host(&self) -> &'static str {
        match self {
            Self::EHentai => "e-hentai.org",
            Self::ExHentai => "exhentai.org",
        }
    }

    pub fn listing_base(&self) -> String {
        format!("https://{}", self.host())
    }

    /// Both sites share one metadata API endpoint.
    pub fn api_endpoint(&self) -> String {
        "https://api.e-hentai.org/api.php".to_string()
    }
}

/// Builds an HTTP client with the fixed per-call timeout
pub fn build_http_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(15))
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}

/// HTTP access to one catalog: the listing pages and the metadata API.
pub struct CatalogClient {
    pub(crate) http: Client,
    pub(crate) api_endpoint: String,
    pub(crate) retry_count: u32,
    listing_base: String,
    cookies: Option<String>,
    extractor: Box<dyn ListingExtractor>,
}

impl CatalogClient {
    /// Creates a client against explicit endpoints.
    ///
    /// # Arguments
    ///
    /// * `listing_base` - Base URL of the listing, without a trailing slash
    /// * `api_endpoint` - Full URL of the metadata API
    /// * `cookies` - Session cookie string sent with listing requests
    /// * `retry_count` - Retry budget for transient failures
    pub fn new(
        listing_base: String,
        api_endpoint: String,
        cookies: Option<String>,
        retry_count: u32,
    ) -> Result<Self> {
        let http = build_http_client()?;
        Ok(Self {
            http,
            api_endpoint,
            retry_count,
            listing_base,
            cookies,
            extractor: Box::new(RegexExtractor::new()),
        })
    }

    /// Creates a client for one of the supported sites.
    pub fn for_site(site: Site, cookies: Option<String>, retry_count: u32) -> Result<Self> {
        Self::new(site.listing_base(), site.api_endpoint(), cookies, retry_count)
    }

    /// Swaps the listing extraction strategy.
    pub fn with_extractor(mut self, extractor: Box<dyn ListingExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Fetches one listing page for the given cursor.
    ///
    /// The cursor names the newest already-stored gallery; the listing
    /// answers with entries strictly before it, newest first. An empty vec
    /// is a meaningful result (the mirror has caught up to the present) and
    /// is distinct from the error paths.
    ///
    /// A body carrying a ban notice triggers the cooldown and a refetch of
    /// the same cursor; the fetch is idempotent so repeating it is safe.
    pub async fn fetch_listing(&self, cursor: i64) -> Result<Vec<PageEntry>> {
        let url = self.listing_url(cursor);

        for _ in 0..MAX_BAN_ROUNDS {
            let body = self.fetch_listing_body(&url).await?;

            if let Some(wait_secs) = detect_ban(&body) {
                run_cooldown(wait_secs).await;
                continue;
            }

            return Ok(self.extractor.extract(&body));
        }

        Err(KagamiError::BanPersisted(MAX_BAN_ROUNDS))
    }

    fn listing_url(&self, cursor: i64) -> String {
        format!(
            "{}/?prev={}&f_cats=0&advsearch=1&f_sname=on&f_stags=on&f_sh=&f_spf=&f_spt=&f_sfl=on&f_sfu=on",
            self.listing_base, cursor
        )
    }

    /// Fetches the raw listing body, retrying transient failures up to the
    /// retry budget with a fixed delay. Exhaustion surfaces the last error.
    async fn fetch_listing_body(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_fetch_body(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retry_count => {
                    tracing::error!(
                        "Listing fetch attempt {}/{} failed: {}",
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

    async fn try_fetch_body(&self, url: &str) -> Result<String> {
        let mut request = self
            .http
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*")
            .header("Accept-Language", "en-US;q=0.9,en;q=0.8")
            .header("DNT", "1")
            .header("Referer", &self.listing_base)
            .header("Upgrade-Insecure-Requests", "1");
        if let Some(cookies) = &self.cookies {
            request = request.header("Cookie", cookies.clone());
        }

        let response = request.send().await.map_err(|source| KagamiError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KagamiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| KagamiError::Http {
            url: url.to_string(),
            source,
        })
    }
}
