//! Error taxonomy for the archive client

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which half of the two-step login failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// Web form login that should issue the session cookies
    WebLogin,
    /// Exchange of session cookies for S3-style access keys
    KeyExchange,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStage::WebLogin => f.write_str("web login"),
            AuthStage::KeyExchange => f.write_str("key exchange"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("login failed during {stage}: {reason}")]
    Auth { stage: AuthStage, reason: String },

    #[error("capture failed: {message}")]
    Job { message: String },

    #[error("unrecognized capture status '{status}'")]
    UnrecognizedStatus { status: String },

    #[error("capture still pending after {attempts} polls ({elapsed:?})")]
    PollTimeout { attempts: u32, elapsed: Duration },

    #[error("capture polling was cancelled")]
    Cancelled,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// Stable machine-readable code for rendering layers
    pub fn kind(&self) -> &'static str {
        match self {
            ArchiveError::Transport(_) => "TRANSPORT_ERROR",
            ArchiveError::Timeout => "TRANSPORT_TIMEOUT",
            ArchiveError::HttpStatus { .. } => "HTTP_STATUS_ERROR",
            ArchiveError::Parse(_) => "PARSE_ERROR",
            ArchiveError::Auth { .. } => "AUTH_ERROR",
            ArchiveError::Job { .. } => "JOB_ERROR",
            ArchiveError::UnrecognizedStatus { .. } => "UNRECOGNIZED_STATUS",
            ArchiveError::PollTimeout { .. } => "POLL_TIMEOUT",
            ArchiveError::Cancelled => "CANCELLED",
            ArchiveError::InvalidUrl(_) => "INVALID_URL",
            ArchiveError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Raw text reported by the server, when there is one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ArchiveError::Job { message } => Some(message),
            _ => None,
        }
    }

    /// Re-tag any failure from the login flow as an auth failure
    pub(crate) fn into_auth(self, stage: AuthStage) -> Self {
        match self {
            ArchiveError::Auth { .. } => self,
            other => ArchiveError::Auth {
                stage,
                reason: other.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ArchiveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ArchiveError::Timeout
        } else if e.is_builder() {
            ArchiveError::InvalidUrl(e.to_string())
        } else {
            ArchiveError::Transport(e.to_string())
        }
    }
}
