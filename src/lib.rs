pub mod client;
pub mod config;
pub mod error;
pub mod humanize;
pub mod observability;
pub mod urls;

pub use client::ArchiveClient;
pub use error::{ArchiveError, Result};
