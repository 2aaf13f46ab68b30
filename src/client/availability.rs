//! Single-shot "has this URL been archived?" lookup

use super::ArchiveClient;
use crate::urls::is_valid_web_url;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const AVAILABILITY_PATH: &str = "/wayback/available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub archived_url: Option<String>,
}

impl AvailabilityResult {
    pub fn not_available() -> Self {
        Self {
            available: false,
            archived_url: None,
        }
    }

    fn archived_at(url: String) -> Self {
        Self {
            available: true,
            archived_url: Some(url),
        }
    }
}

// results[0].archived_snapshots.closest.{available,status,url}
#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    results: Vec<AvailabilityEntry>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityEntry {
    #[serde(default)]
    archived_snapshots: Option<ArchivedSnapshots>,
}

#[derive(Debug, Deserialize)]
struct ArchivedSnapshots {
    #[serde(default)]
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    #[serde(default)]
    available: Option<bool>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Extract the closest snapshot URL, if it is available, returned 200 and
/// looks like an http(s) URL
fn extract_wayback_url(body: &str) -> Option<String> {
    let response: AvailabilityResponse = serde_json::from_str(body).ok()?;
    let closest = response
        .results
        .into_iter()
        .next()?
        .archived_snapshots?
        .closest?;

    if closest.available != Some(true) || closest.status.as_deref() != Some("200") {
        return None;
    }

    closest.url.filter(|url| is_valid_web_url(Some(url)))
}

impl ArchiveClient {
    /// Check whether `url` has an archived snapshot.
    ///
    /// Never fails: transport errors, any status other than 200 (including
    /// other 2xx codes) and malformed bodies all read as "not available".
    pub async fn check_availability(&self, url: &str) -> AvailabilityResult {
        // The URL goes into the body as-is
        let request = self
            .http
            .post(self.web_endpoint(AVAILABILITY_PATH))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("url={}", url));

        let body = match self.send_ok(request).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url, error = %e, "Availability lookup failed");
                return AvailabilityResult::not_available();
            }
        };

        match extract_wayback_url(&body) {
            Some(archived_url) => {
                debug!(url, archived_url = %archived_url, "Snapshot available");
                AvailabilityResult::archived_at(archived_url)
            }
            None => {
                debug!(url, "No usable snapshot in availability response");
                AvailabilityResult::not_available()
            }
        }
    }
}
