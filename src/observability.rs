//! In-process counters for the archive client

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle shared by every clone of a client
#[derive(Debug, Default)]
pub struct Metrics {
    requests_sent: AtomicU64,
    logins_succeeded: AtomicU64,
    logins_failed: AtomicU64,
    captures_submitted: AtomicU64,
    captures_succeeded: AtomicU64,
    captures_failed: AtomicU64,
    status_polls: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn login_succeeded(&self) {
        self.logins_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "logins_succeeded", "Metric incremented");
    }

    pub fn login_failed(&self) {
        self.logins_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "logins_failed", "Metric incremented");
    }

    pub fn capture_submitted(&self) {
        self.captures_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "captures_submitted", "Metric incremented");
    }

    pub fn capture_succeeded(&self) {
        self.captures_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "captures_succeeded", "Metric incremented");
    }

    pub fn capture_failed(&self) {
        self.captures_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "captures_failed", "Metric incremented");
    }

    pub fn status_polled(&self) {
        self.status_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            logins_succeeded: self.logins_succeeded.load(Ordering::Relaxed),
            logins_failed: self.logins_failed.load(Ordering::Relaxed),
            captures_submitted: self.captures_submitted.load(Ordering::Relaxed),
            captures_succeeded: self.captures_succeeded.load(Ordering::Relaxed),
            captures_failed: self.captures_failed.load(Ordering::Relaxed),
            status_polls: self.status_polls.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub logins_succeeded: u64,
    pub logins_failed: u64,
    pub captures_submitted: u64,
    pub captures_succeeded: u64,
    pub captures_failed: u64,
    pub status_polls: u64,
}
