//! Capture job polling
//!
//! A submitted job is polled from a dedicated tokio task. The task issues one
//! status request at a time, reports every `pending` tick, and stops at the
//! first terminal outcome: success, server error, unrecognised status,
//! transport failure, or an exhausted poll budget.
//!
//! ```text
//! submitted ──► pending ──► … ──► succeeded
//!                  │
//!                  └──────────────► failed
//! ```
//!
//! [`CaptureWatch`] is the caller's handle on that task. Cancelling it (or
//! dropping it) stops the task at its next suspension point, abandons the
//! sleep between polls, and guarantees that no further event is delivered.

use super::ArchiveClient;
use super::auth::AuthorizationContext;
use super::capture::{CaptureOptions, CaptureStatus, CaptureSuccess, JobId};
use crate::config::CaptureConfig;
use crate::error::{ArchiveError, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 16;

/// Timing and budget of the status poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait between submission and the first status query (used by `save_page`)
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_interval: Duration,
    /// Multiplier applied to the interval after each pending tick
    pub backoff_factor: f64,
    pub max_wait: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

impl PollPolicy {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            initial_delay: config.initial_delay.as_duration(),
            interval: config.poll_interval.as_duration(),
            max_interval: config.max_poll_interval.as_duration(),
            backoff_factor: config.backoff_factor,
            max_wait: Some(config.max_wait.as_duration()),
            max_attempts: config.max_attempts,
        }
    }

    /// Fixed interval with no budget
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval,
            max_interval: interval,
            backoff_factor: 1.0,
            max_wait: None,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_factor <= 1.0 {
            return current;
        }
        // Fields are public, so the factor may be huge or infinite here
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

/// Progress report for one `pending` status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProgress {
    pub job_id: JobId,
    /// 1-based number of the status query that reported this
    pub attempt: u32,
    pub resources: Vec<String>,
}

impl PendingProgress {
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

#[derive(Debug)]
pub enum CaptureEvent {
    Pending(PendingProgress),
    Succeeded(CaptureSuccess),
    Failed(ArchiveError),
}

impl CaptureEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CaptureEvent::Pending(_))
    }
}

/// Handle on a running poll loop
///
/// Yields zero or more [`CaptureEvent::Pending`] followed by exactly one
/// terminal event, unless cancelled first.
#[derive(Debug)]
pub struct CaptureWatch {
    job_id: JobId,
    events: mpsc::Receiver<CaptureEvent>,
    cancel: CancellationToken,
}

impl CaptureWatch {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Next event, or `None` once the loop has finished or been cancelled
    pub async fn next_event(&mut self) -> Option<CaptureEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Stop polling. No event is delivered after this returns.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!(job_id = %self.job_id, "Capture polling cancelled");
            self.cancel.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this watch, for callers that cancel from elsewhere
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive the watch to its terminal event, reporting each pending tick
    pub async fn wait<F>(mut self, mut on_pending: F) -> Result<CaptureSuccess>
    where
        F: FnMut(&PendingProgress),
    {
        while let Some(event) = self.next_event().await {
            match event {
                CaptureEvent::Pending(progress) => on_pending(&progress),
                CaptureEvent::Succeeded(success) => return Ok(success),
                CaptureEvent::Failed(e) => return Err(e),
            }
        }

        Err(ArchiveError::Cancelled)
    }
}

impl Drop for CaptureWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct PollLoop {
    client: ArchiveClient,
    job_id: JobId,
    auth: AuthorizationContext,
    options: CaptureOptions,
    policy: PollPolicy,
    events: mpsc::Sender<CaptureEvent>,
    cancel: CancellationToken,
}

impl PollLoop {
    async fn run(self) {
        let started = Instant::now();
        let mut interval = self.policy.interval;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(job_id = %self.job_id, attempt, "Polling capture status");

            let status = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                status = self.client.fetch_status(&self.job_id, &self.auth, &self.options) => {
                    status
                }
            };

            let event = match status {
                Ok(CaptureStatus::Pending { resources }) => CaptureEvent::Pending(PendingProgress {
                    job_id: self.job_id.clone(),
                    attempt,
                    resources,
                }),
                Ok(CaptureStatus::Succeeded(success)) => CaptureEvent::Succeeded(success),
                Err(e) => CaptureEvent::Failed(e),
            };

            if event.is_terminal() {
                self.finish(event).await;
                return;
            }

            if !self.deliver(event).await {
                return;
            }

            let elapsed = started.elapsed();
            let attempts_exhausted = self.policy.max_attempts.is_some_and(|max| attempt >= max);
            let remaining = match self.policy.max_wait {
                Some(max_wait) => max_wait.saturating_sub(elapsed),
                None => Duration::MAX,
            };

            if attempts_exhausted || remaining.is_zero() {
                self.finish(CaptureEvent::Failed(ArchiveError::PollTimeout {
                    attempts: attempt,
                    elapsed,
                }))
                .await;
                return;
            }

            // The last poll lands on the deadline rather than past it
            let delay = interval.min(remaining);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            interval = self.policy.next_interval(interval);
        }
    }

    async fn finish(&self, event: CaptureEvent) {
        match &event {
            CaptureEvent::Succeeded(success) => {
                self.client.metrics.capture_succeeded();
                info!(
                    job_id = %self.job_id,
                    archive_url = %success.archive_url,
                    "Capture completed"
                );
            }
            CaptureEvent::Failed(e) => {
                self.client.metrics.capture_failed();
                warn!(job_id = %self.job_id, kind = e.kind(), error = %e, "Capture failed");
            }
            CaptureEvent::Pending(_) => {}
        }

        self.deliver(event).await;
    }

    /// Hand an event to the watch; false once nobody can receive it
    async fn deliver(&self, event: CaptureEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }
}

impl ArchiveClient {
    /// Start polling `job_id` with the client's configured policy.
    ///
    /// Must be called from within a tokio runtime.
    pub fn poll_status(
        &self,
        job_id: JobId,
        auth: AuthorizationContext,
        options: CaptureOptions,
    ) -> CaptureWatch {
        let policy = self.settings.poll_policy.clone();
        self.poll_status_with_policy(job_id, auth, options, policy)
    }

    pub fn poll_status_with_policy(
        &self,
        job_id: JobId,
        auth: AuthorizationContext,
        options: CaptureOptions,
        policy: PollPolicy,
    ) -> CaptureWatch {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let poll_loop = PollLoop {
            client: self.clone(),
            job_id: job_id.clone(),
            auth,
            options,
            policy,
            events: tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(poll_loop.run());

        CaptureWatch {
            job_id,
            events: rx,
            cancel,
        }
    }

    /// Poll `job_id` to completion, calling `on_pending` for every pending tick
    pub async fn await_capture<F>(
        &self,
        job_id: JobId,
        auth: AuthorizationContext,
        options: CaptureOptions,
        on_pending: F,
    ) -> Result<CaptureSuccess>
    where
        F: FnMut(&PendingProgress),
    {
        self.poll_status(job_id, auth, options)
            .wait(on_pending)
            .await
    }

    /// Submit a capture and wait for its outcome
    pub async fn save_page<F>(
        &self,
        url: &str,
        auth: &AuthorizationContext,
        options: CaptureOptions,
        on_pending: F,
    ) -> Result<CaptureSuccess>
    where
        F: FnMut(&PendingProgress),
    {
        let job_id = self.submit_capture(url, auth, &options).await?;

        let delay = self.settings.poll_policy.initial_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.await_capture(job_id, auth.clone(), options, on_pending)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HumanDuration;

    #[test]
    fn test_policy_from_default_config() {
        let policy = PollPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.interval, Duration::from_secs(3));
        assert_eq!(policy.max_wait, Some(Duration::from_secs(600)));
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn test_fixed_interval_never_grows() {
        let policy = PollPolicy::fixed(Duration::from_secs(3));
        assert_eq!(
            policy.next_interval(Duration::from_secs(3)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = CaptureConfig {
            poll_interval: HumanDuration::from_secs(2),
            max_poll_interval: HumanDuration::from_secs(5),
            backoff_factor: 2.0,
            ..CaptureConfig::default()
        };
        let policy = PollPolicy::from_config(&config);

        let second = policy.next_interval(policy.interval);
        let third = policy.next_interval(second);
        assert_eq!(second, Duration::from_secs(4));
        assert_eq!(third, Duration::from_secs(5));
    }

    #[test]
    fn test_oversized_backoff_saturates() {
        let mut policy = PollPolicy::fixed(Duration::from_secs(3));
        policy.max_interval = Duration::from_secs(30);

        for factor in [1e30, f64::INFINITY, f64::MAX] {
            policy.backoff_factor = factor;
            assert_eq!(
                policy.next_interval(Duration::from_secs(3)),
                Duration::from_secs(30)
            );
        }
    }

    #[test]
    fn test_event_terminality() {
        let pending = CaptureEvent::Pending(PendingProgress {
            job_id: JobId::new("job"),
            attempt: 1,
            resources: vec!["a".to_string()],
        });
        assert!(!pending.is_terminal());
        assert!(CaptureEvent::Failed(ArchiveError::Cancelled).is_terminal());
    }
}
