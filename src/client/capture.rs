//! Save Page Now v2: capture submission and single status queries

use super::auth::AuthorizationContext;
use super::{ArchiveClient, parse_json};
use crate::error::{ArchiveError, Result};
use crate::urls::archive_url;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

const SAVE_PATH: &str = "/save/";
const STATUS_PATH: &str = "/save/status/";

const DEFAULT_ERROR_MESSAGE: &str = "capture failed without a message";

/// Server-issued capture job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaptureOption {
    /// Save pages even when they answer 4xx/5xx
    AllErrors,
    Outlinks,
    /// Full-page PNG screenshot
    Screenshot,
    /// Ask the status endpoint for outlink availability
    Availability,
}

/// Set of capture flags; order and duplicates are irrelevant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureOptions(BTreeSet<CaptureOption>);

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, option: CaptureOption) -> Self {
        self.0.insert(option);
        self
    }

    pub fn insert(&mut self, option: CaptureOption) {
        self.0.insert(option);
    }

    pub fn contains(&self, option: CaptureOption) -> bool {
        self.0.contains(&option)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Form fields sent with the capture request
    fn submit_fields(&self) -> Vec<(&'static str, &'static str)> {
        self.0
            .iter()
            .filter_map(|option| match option {
                CaptureOption::AllErrors => Some(("capture_all", "1")),
                CaptureOption::Outlinks => Some(("capture_outlinks", "1")),
                CaptureOption::Screenshot => Some(("capture_screenshot", "1")),
                CaptureOption::Availability => None,
            })
            .collect()
    }

    /// Form fields sent with each status query
    fn status_fields(&self) -> Vec<(&'static str, &'static str)> {
        if self.contains(CaptureOption::Availability) {
            vec![("outlinks_availability", "1")]
        } else {
            Vec::new()
        }
    }
}

impl FromIterator<CaptureOption> for CaptureOptions {
    fn from_iter<I: IntoIterator<Item = CaptureOption>>(iter: I) -> Self {
        CaptureOptions(iter.into_iter().collect())
    }
}

/// Final result of a successful capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSuccess {
    pub job_id: JobId,
    pub timestamp: String,
    pub original_url: String,
    pub archive_url: String,
    pub resources: Vec<String>,
    pub outlinks: usize,
    pub screenshot: Option<String>,
}

/// Outcome of one status query that did not end in failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Pending { resources: Vec<String> },
    Succeeded(CaptureSuccess),
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Loosely typed fields are kept as `Value` so that an odd shape in one of
/// them does not sink the whole response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    original_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    resources: Option<Value>,
    #[serde(default)]
    outlinks: Option<Value>,
    #[serde(default)]
    screenshot: Option<String>,
}

fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn entry_count(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(map)) => map.len(),
        _ => 0,
    }
}

/// Map a status response onto the capture job state machine
pub(crate) fn interpret_status(
    job_id: &JobId,
    wayback_base: &str,
    response: StatusResponse,
) -> Result<CaptureStatus> {
    let Some(status) = response.status else {
        return Err(ArchiveError::Parse(
            "status response has no 'status' field".to_string(),
        ));
    };

    match status.as_str() {
        "pending" => Ok(CaptureStatus::Pending {
            resources: string_list(response.resources),
        }),
        "success" => {
            let (Some(timestamp), Some(original_url)) = (response.timestamp, response.original_url)
            else {
                return Err(ArchiveError::Parse(
                    "successful status is missing 'timestamp' or 'original_url'".to_string(),
                ));
            };

            let outlinks = entry_count(response.outlinks.as_ref());
            Ok(CaptureStatus::Succeeded(CaptureSuccess {
                job_id: job_id.clone(),
                archive_url: archive_url(wayback_base, &timestamp, &original_url),
                timestamp,
                original_url,
                resources: string_list(response.resources),
                outlinks,
                screenshot: response.screenshot,
            }))
        }
        "error" => Err(ArchiveError::Job {
            message: response
                .message
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        }),
        _ => Err(ArchiveError::UnrecognizedStatus { status }),
    }
}

impl ArchiveClient {
    /// Submit a capture job for `url` and return its job id
    pub async fn submit_capture(
        &self,
        url: &str,
        auth: &AuthorizationContext,
        options: &CaptureOptions,
    ) -> Result<JobId> {
        let mut form = vec![("url", url)];
        form.extend(options.submit_fields());

        let request = auth.apply(
            self.http
                .post(self.wayback_endpoint(SAVE_PATH))
                .header(ACCEPT, "application/json")
                .form(&form),
        );

        debug!(url, auth = auth.variant(), options = options.len(), "Submitting capture");

        let result = self.send(request).await.and_then(|body| {
            let response: SubmitResponse = parse_json(&body, "capture response")?;
            match response {
                SubmitResponse {
                    job_id: Some(job_id),
                    ..
                } if !job_id.is_empty() => Ok(JobId(job_id)),
                SubmitResponse {
                    status: Some(status),
                    message: Some(message),
                    ..
                } if status == "error" => Err(ArchiveError::Job { message }),
                _ => Err(ArchiveError::Parse(
                    "capture response has no 'job_id'".to_string(),
                )),
            }
        });

        match &result {
            Ok(job_id) => {
                self.metrics.capture_submitted();
                info!(url, job_id = %job_id, "Capture submitted");
            }
            Err(e) => {
                self.metrics.capture_failed();
                warn!(url, error = %e, "Capture submission failed");
            }
        }

        result
    }

    /// Query a capture job once.
    ///
    /// `error` and unknown statuses come back as [`ArchiveError::Job`] and
    /// [`ArchiveError::UnrecognizedStatus`].
    pub async fn fetch_status(
        &self,
        job_id: &JobId,
        auth: &AuthorizationContext,
        options: &CaptureOptions,
    ) -> Result<CaptureStatus> {
        let mut form = vec![("job_id", job_id.as_str())];
        form.extend(options.status_fields());

        let request = auth.apply(
            self.http
                .post(self.wayback_endpoint(STATUS_PATH))
                .header(ACCEPT, "application/json")
                .form(&form),
        );

        self.metrics.status_polled();

        let body = self.send(request).await?;
        let response: StatusResponse = parse_json(&body, "status response")?;

        interpret_status(job_id, &self.settings.wayback_base_url, response)
    }
}
