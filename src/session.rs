//! Session cookie handling
//!
//! The restricted catalog only answers authenticated requests, so its
//! listing fetches carry a session cookie string. Sources, in order of
//! precedence: an explicit browser-export cookie file, the `COOKIE`
//! environment variable, and (for the open catalog only) a local `.cookies`
//! file. The open catalog works unauthenticated; the restricted one does
//! not, so an empty resolution is fatal there.

use serde::Deserialize;
use std::path::Path;

use crate::catalog::Site;
use crate::SessionError;

/// Cookies a browser export must contain for the restricted catalog,
/// in the order they are rendered into the Cookie header.
const REQUIRED_COOKIES: [&str; 3] = ["igneous", "ipb_pass_hash", "ipb_member_id"];

/// One entry of a browser-exported JSON cookie file.
///
/// Exports carry a dozen other fields (domain, expiry, sameSite, ...);
/// only the name/value pair matters here and the rest are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Builds a `name=value; name=value; name=value` cookie string from a
/// browser-export JSON file, requiring all three session cookies.
pub fn load_cookie_file(path: &Path) -> Result<String, SessionError> {
    let data = std::fs::read_to_string(path)?;
    let cookies: Vec<Cookie> = serde_json::from_str(&data)?;

    let mut pairs = Vec::with_capacity(REQUIRED_COOKIES.len());
    for name in REQUIRED_COOKIES {
        let value = cookies
            .iter()
            .find(|cookie| cookie.name == name)
            .map(|cookie| cookie.value.as_str())
            .filter(|value| !value.is_empty())
            .ok_or(SessionError::MissingCookie(name))?;
        pairs.push(format!("{}={}", name, value));
    }

    Ok(pairs.join("; "))
}

/// Resolves the session cookie string for a site.
///
/// Returns `Ok(None)` when the open catalog runs unauthenticated; for the
/// restricted catalog a missing session is an error because every request
/// would be rejected anyway.
pub fn resolve_session(
    site: Site,
    cookie_file: Option<&Path>,
) -> Result<Option<String>, SessionError> {
    if let Some(path) = cookie_file {
        let cookies = load_cookie_file(path)?;
        tracing::info!("Using session cookies from {}", path.display());
        return Ok(Some(cookies));
    }

    if let Ok(env_cookie) = std::env::var("COOKIE") {
        if !env_cookie.is_empty() {
            tracing::info!("Using session cookies from COOKIE environment variable");
            return Ok(Some(env_cookie));
        }
    }

    match site {
        Site::ExHentai => Err(SessionError::MissingSession(site.host().to_string())),
        Site::EHentai => match std::fs::read_to_string(".cookies") {
            Ok(data) => {
                tracing::info!("Using session cookies from local .cookies file");
                Ok(Some(data.trim().to_string()))
            }
            Err(_) => {
                tracing::warn!("No session cookies found, proceeding unauthenticated");
                Ok(None)
            }
        },
    }
}
