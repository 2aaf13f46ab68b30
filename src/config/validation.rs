use super::models::Config;
use crate::urls::is_valid_web_url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Endpoint '{field}' must start with http:// or https://, got '{value}'")]
    InvalidBaseUrl { field: String, value: String },

    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: String },

    #[error("backoff_factor must be at least 1.0, got {0}")]
    InvalidBackoffFactor(f64),

    #[error("max_poll_interval ({max}) is shorter than poll_interval ({interval})")]
    PollIntervalOrder { interval: String, max: String },

    #[error("max_attempts must be positive when set")]
    ZeroMaxAttempts,

    #[error("User agent must not be empty")]
    EmptyUserAgent,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_endpoints(config)?;
    validate_http(config)?;
    validate_capture(config)?;
    Ok(())
}

fn validate_endpoints(config: &Config) -> Result<(), ValidationError> {
    let endpoints = [
        ("endpoints.wayback_base_url", &config.endpoints.wayback_base_url),
        ("endpoints.web_base_url", &config.endpoints.web_base_url),
    ];

    for (field, value) in endpoints {
        if !is_valid_web_url(Some(value)) {
            return Err(ValidationError::InvalidBaseUrl {
                field: field.to_string(),
                value: value.clone(),
            });
        }
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    if config.http.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    for (field, value) in [
        ("http.connect_timeout", config.http.connect_timeout),
        ("http.request_timeout", config.http.request_timeout),
    ] {
        if value.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

/// initial_delay may be zero; every other capture duration must be positive
fn validate_capture(config: &Config) -> Result<(), ValidationError> {
    let capture = &config.capture;

    for (field, value) in [
        ("capture.poll_interval", capture.poll_interval),
        ("capture.max_poll_interval", capture.max_poll_interval),
        ("capture.max_wait", capture.max_wait),
    ] {
        if value.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: field.to_string(),
            });
        }
    }

    if !capture.backoff_factor.is_finite() || capture.backoff_factor < 1.0 {
        return Err(ValidationError::InvalidBackoffFactor(capture.backoff_factor));
    }

    if capture.max_poll_interval < capture.poll_interval {
        return Err(ValidationError::PollIntervalOrder {
            interval: capture.poll_interval.to_string(),
            max: capture.max_poll_interval.to_string(),
        });
    }

    if capture.max_attempts == Some(0) {
        return Err(ValidationError::ZeroMaxAttempts);
    }

    Ok(())
}
