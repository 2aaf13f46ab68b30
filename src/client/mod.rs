//! Wayback Machine / archive.org API client
//!
//! One [`ArchiveClient`] talks to both backend families: the archive.org web
//! host (account login, S3 keys, availability) and the Wayback host (Save Page
//! Now v2 capture and CDX search). Authenticated calls take an explicit
//! [`AuthorizationContext`]; the client itself holds no session state.

pub mod auth;
pub mod availability;
pub mod capture;
pub mod poller;
pub mod search;

pub use auth::{AccessKeys, AuthorizationContext, SessionCookies, UserSession};
pub use availability::AvailabilityResult;
pub use capture::{CaptureOption, CaptureOptions, CaptureStatus, CaptureSuccess, JobId};
pub use poller::{CaptureEvent, CaptureWatch, PendingProgress, PollPolicy};
pub use search::{Snapshot, WaybackCount};

use crate::config::Config;
use crate::error::{ArchiveError, Result};
use crate::observability::{Metrics, MetricsSnapshot};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const EXTENSION_VERSION_HEADER: &str = "wayback-extension-version";
const API_VERSION_HEADER: &str = "wayback-api-version";

/// Resolved settings shared by every clone of a client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub wayback_base_url: String,
    pub web_base_url: String,
    pub user_agent: String,
    pub api_version: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_policy: PollPolicy,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            wayback_base_url: config
                .endpoints
                .wayback_base_url
                .trim_end_matches('/')
                .to_string(),
            web_base_url: config.endpoints.web_base_url.trim_end_matches('/').to_string(),
            user_agent: config.http.user_agent.clone(),
            api_version: config.http.api_version.clone(),
            connect_timeout: config.http.connect_timeout.as_duration(),
            request_timeout: config.http.request_timeout.as_duration(),
            poll_policy: PollPolicy::from_config(&config.capture),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Archive API client
///
/// Cheap to clone; clones share the connection pool and metrics.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: Client,
    settings: Arc<ClientSettings>,
    metrics: Arc<Metrics>,
}

impl ArchiveClient {
    /// Create a client from loaded configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_settings(ClientSettings::from_config(config))
    }

    pub fn with_settings(settings: ClientSettings) -> Result<Self> {
        let http = http_builder(&settings)?
            .build()
            .map_err(|e| ArchiveError::Config(e.to_string()))?;

        Ok(Self {
            http,
            settings: Arc::new(settings),
            metrics: Arc::new(Metrics::new()),
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.settings.poll_policy
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn wayback_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.wayback_base_url, path)
    }

    fn web_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.web_base_url, path)
    }

    /// Send a request and return the body of a 2xx response
    async fn send(&self, request: RequestBuilder) -> Result<String> {
        send_with_metrics(&self.metrics, request).await
    }

    /// Send a request and return the body only for exactly `200 OK`
    async fn send_ok(&self, request: RequestBuilder) -> Result<String> {
        receive(&self.metrics, request, |status| status == StatusCode::OK).await
    }
}

/// Builder carrying timeouts, user agent and the Wayback version headers
fn http_builder(settings: &ClientSettings) -> Result<ClientBuilder> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(EXTENSION_VERSION_HEADER),
        header_value(&settings.user_agent)?,
    );
    headers.insert(
        HeaderName::from_static(API_VERSION_HEADER),
        header_value(&settings.api_version)?,
    );

    Ok(Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(&settings.user_agent)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ArchiveError::Config(format!("invalid header value '{}': {}", value, e)))
}

async fn send_with_metrics(metrics: &Metrics, request: RequestBuilder) -> Result<String> {
    receive(metrics, request, |status| status.is_success()).await
}

async fn receive<F>(metrics: &Metrics, request: RequestBuilder, accept: F) -> Result<String>
where
    F: Fn(StatusCode) -> bool,
{
    metrics.request_sent();

    let response = request.send().await?;

    let status = response.status();
    let url = response.url().path().to_string();
    if !accept(status) {
        debug!(path = %url, status = status.as_u16(), "Request rejected");
        return Err(ArchiveError::HttpStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ArchiveError::Transport(format!("Failed to read body: {}", e)))?;

    debug!(path = %url, status = status.as_u16(), size = body.len(), "Request completed");

    Ok(body)
}

/// Decode a JSON body, mapping any failure to [`ArchiveError::Parse`]
fn parse_json<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ArchiveError::Parse(format!("{}: {}", what, e)))
}
