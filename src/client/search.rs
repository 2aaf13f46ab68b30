//! CDX snapshot search and per-URL capture counts

use super::{ArchiveClient, parse_json};
use crate::error::Result;
use crate::urls::archive_url;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

const CDX_SEARCH_PATH: &str = "/cdx/search/cdx";

/// One archived copy of a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub original_url: String,
    pub captured_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn archive_url(&self, wayback_base: &str) -> String {
        archive_url(wayback_base, &self.timestamp, &self.original_url)
    }
}

/// How often a URL has been saved, and over what span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaybackCount {
    pub count: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

impl WaybackCount {
    /// Summarise snapshots; `None` when there are none
    pub fn from_snapshots(snapshots: &[Snapshot]) -> Option<Self> {
        if snapshots.is_empty() {
            return None;
        }

        let dates = snapshots.iter().filter_map(|s| s.captured_at);
        Some(Self {
            count: snapshots.len(),
            first: dates.clone().min(),
            last: dates.max(),
        })
    }
}

/// Parse a CDX timestamp (`YYYYMMDDhhmmss`, possibly truncated).
pub fn parse_cdx_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    const FILL: &str = "00000101000000";

    if timestamp.is_empty()
        || timestamp.len() > FILL.len()
        || !timestamp.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let padded = format!("{}{}", timestamp, &FILL[timestamp.len()..]);
    NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Rows of an `output=json` CDX response; the first row names the columns
fn parse_cdx_rows(body: &str) -> Result<Vec<Snapshot>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<Vec<String>> = parse_json(body, "CDX response")?;
    let mut rows = rows.into_iter();

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let column = |name: &str, fallback: usize| {
        header.iter().position(|h| h == name).unwrap_or(fallback)
    };
    let ts_idx = column("timestamp", 0);
    let original_idx = column("original", 1);

    Ok(rows
        .filter_map(|row| {
            let timestamp = row.get(ts_idx)?.clone();
            let original_url = row.get(original_idx)?.clone();
            Some(Snapshot {
                captured_at: parse_cdx_timestamp(&timestamp),
                timestamp,
                original_url,
            })
        })
        .collect())
}

impl ArchiveClient {
    /// List successful HTML captures under `url` (prefix match)
    pub async fn search_snapshots(&self, url: &str) -> Result<Vec<Snapshot>> {
        let prefix = format!("{}/", url.trim_end_matches('/'));
        let request = self.http.get(self.wayback_endpoint(CDX_SEARCH_PATH)).query(&[
            ("url", prefix.as_str()),
            ("fl", "timestamp,original"),
            ("matchType", "prefix"),
            ("filter", "statuscode:200"),
            ("filter", "mimetype:text/html"),
            ("output", "json"),
        ]);

        let body = self.send(request).await?;
        let snapshots = parse_cdx_rows(&body)?;

        debug!(url, count = snapshots.len(), "CDX search completed");

        Ok(snapshots)
    }

    /// Capture count with first and last capture dates
    pub async fn wayback_count(&self, url: &str) -> Result<Option<WaybackCount>> {
        let snapshots = self.search_snapshots(url).await?;
        Ok(WaybackCount::from_snapshots(&snapshots))
    }
}
