use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Credentials (loaded from environment, never from the config file)
    #[serde(skip)]
    pub credentials: CredentialsConfig,
}

/// Base URLs of the two backend families
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointsConfig {
    /// Wayback Machine host: SPN2 capture and CDX search
    #[serde(default = "default_wayback_base_url")]
    pub wayback_base_url: String,
    /// archive.org host: account login, S3 keys and availability
    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            wayback_base_url: default_wayback_base_url(),
            web_base_url: default_web_base_url(),
        }
    }
}

fn default_wayback_base_url() -> String {
    "https://web.archive.org".to_string()
}

fn default_web_base_url() -> String {
    "https://archive.org".to_string()
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Sent as both `User-Agent` and `Wayback-Extension-Version`
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            api_version: default_api_version(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    format!("Wayback_Machine_Rust/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_version() -> String {
    "2".to_string()
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(60)
}

/// Save Page Now status polling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Delay between submitting a capture and the first status query
    #[serde(default = "default_initial_delay")]
    pub initial_delay: HumanDuration,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: HumanDuration,
    #[serde(default = "default_max_poll_interval")]
    pub max_poll_interval: HumanDuration,
    /// 1.0 keeps the interval fixed
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Give up on a job still pending after this long
    #[serde(default = "default_max_wait")]
    pub max_wait: HumanDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            poll_interval: default_poll_interval(),
            max_poll_interval: default_max_poll_interval(),
            backoff_factor: default_backoff_factor(),
            max_wait: default_max_wait(),
            max_attempts: None,
        }
    }
}

fn default_initial_delay() -> HumanDuration {
    HumanDuration::from_secs(1)
}

fn default_poll_interval() -> HumanDuration {
    HumanDuration::from_secs(3)
}

fn default_max_poll_interval() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_wait() -> HumanDuration {
    HumanDuration::from_secs(10 * 60)
}

/// Stored credentials handed to the client by its caller
#[derive(Debug, Clone, Default)]
pub struct CredentialsConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub logged_in_user: Option<String>,
    pub logged_in_sig: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.endpoints.wayback_base_url, "https://web.archive.org");
        assert_eq!(config.endpoints.web_base_url, "https://archive.org");
        assert_eq!(config.http.api_version, "2");
        assert!(config.http.user_agent.starts_with("Wayback_Machine_Rust/"));
        assert_eq!(config.capture.poll_interval.as_duration(), Duration::from_secs(3));
        assert_eq!(config.capture.initial_delay.as_duration(), Duration::from_secs(1));
        assert_eq!(config.capture.max_wait.as_duration(), Duration::from_secs(600));
        assert_eq!(config.capture.max_attempts, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[capture]
poll_interval = "5s"
max_attempts = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.poll_interval.as_duration(), Duration::from_secs(5));
        assert_eq!(config.capture.max_attempts, Some(20));
        assert_eq!(config.capture.backoff_factor, 1.0);
        assert_eq!(config.endpoints.web_base_url, "https://archive.org");
    }
}
