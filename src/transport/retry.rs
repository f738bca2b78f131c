//! Retry with exponential backoff for transient transport failures
//!
//! The retry logic is split in two:
//! - `RetryState`: a pure state machine (`attempt`, `deadline`, `backoff`) that
//!   decides whether another attempt is allowed and how long to wait first
//! - `send_with_retry`: a thin tokio driver that sleeps between attempts
//!
//! Only connection-level failures are retried. Any HTTP response, whatever
//! its status, ends the loop and is handed back to the caller.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, Transport, TransportError};

/// Backoff configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts (the first try included)
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Optional wall-clock budget across all attempts
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// `min(base * 2^attempt, cap)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// A zero budget still makes one attempt
    fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Progress of one retried call
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    /// Number of attempts that have failed so far
    attempt: u32,
    /// Absolute point after which no new attempt is started
    deadline: Option<Instant>,
    /// Delay chosen after the most recent failure
    backoff: Duration,
}

impl RetryState {
    pub fn new(policy: RetryPolicy, started: Instant) -> Self {
        let deadline = policy.deadline.map(|budget| started + budget);
        Self {
            policy,
            attempt: 0,
            deadline,
            backoff: Duration::ZERO,
        }
    }

    /// Failed attempts so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_backoff(&self) -> Duration {
        self.backoff
    }

    /// Record a failed attempt.
    ///
    /// Returns the delay to wait before the next attempt, or `None` when the
    /// attempt budget or the deadline is exhausted.
    pub fn on_failure(&mut self, now: Instant) -> Option<Duration> {
        let failed = self.attempt;
        self.attempt += 1;

        if self.attempt >= self.policy.attempt_budget() {
            return None;
        }

        let delay = self.policy.backoff(failed);
        if let Some(deadline) = self.deadline {
            if now + delay >= deadline {
                return None;
            }
        }

        self.backoff = delay;
        Some(delay)
    }
}

/// Send a request, retrying transient transport failures.
///
/// Retry exhaustion re-raises the last transport error.
pub async fn send_with_retry<T: Transport>(
    transport: &T,
    policy: &RetryPolicy,
    request: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let mut state = RetryState::new(policy.clone(), Instant::now());

    loop {
        match transport.send(request.clone()).await {
            Ok(response) => {
                if state.attempt() > 0 {
                    debug!(
                        url = %request.url,
                        attempts = state.attempt() + 1,
                        "request succeeded after retry"
                    );
                }
                return Ok(response);
            }
            Err(err) if err.is_transient() => match state.on_failure(Instant::now()) {
                Some(delay) => {
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt = state.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        attempts = state.attempt(),
                        last_delay_ms = state.last_backoff().as_millis() as u64,
                        error = %err,
                        "retry budget exhausted"
                    );
                    return Err(err);
                }
            },
            Err(err) => return Err(err),
        }
    }
}
