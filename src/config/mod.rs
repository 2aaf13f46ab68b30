//! Configuration management for the Wayback client
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use wayback::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Capturing through: {}", config.endpoints.wayback_base_url);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `WAYBACK__<section>__<key>`
//!
//! Examples:
//! - `WAYBACK__ENDPOINTS__WAYBACK_BASE_URL=http://localhost:9000`
//! - `WAYBACK__CAPTURE__POLL_INTERVAL=5s`
//! - `WAYBACK__CAPTURE__MAX_WAIT=15m`
//!
//! Credentials come only from `WAYBACK_ACCESS_KEY`, `WAYBACK_SECRET_KEY`,
//! `WAYBACK_LOGGED_IN_USER` and `WAYBACK_LOGGED_IN_SIG`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/wayback.toml`.
//! This can be overridden using the `WAYBACK_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{CaptureConfig, Config, CredentialsConfig, EndpointsConfig, HttpConfig};
pub use validation::ValidationError;

use crate::client::{AccessKeys, AuthorizationContext, SessionCookies};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`WAYBACK__*`)
    /// 2. TOML file (default: `config/wayback.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (bad endpoints, zero durations, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Authorization assembled from environment credentials.
    ///
    /// Key pairs win over session cookies when both are present.
    pub fn authorization(&self) -> Option<AuthorizationContext> {
        let creds = &self.credentials;

        if let (Some(access_key), Some(secret_key)) = (&creds.access_key, &creds.secret_key) {
            return Some(AuthorizationContext::Keys(AccessKeys {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
            }));
        }

        if let (Some(user), Some(signature)) = (&creds.logged_in_user, &creds.logged_in_sig) {
            return Some(AuthorizationContext::Session(SessionCookies {
                user: user.clone(),
                signature: signature.clone(),
            }));
        }

        None
    }

    /// Effective configuration rendered as TOML (credentials are never included)
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
