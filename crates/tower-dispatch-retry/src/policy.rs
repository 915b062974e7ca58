use crate::backoff::{ExponentialBackoff, IntervalFunction};
use std::sync::Arc;
use std::time::Duration;
use tower_dispatch_core::{ClassifiedError, ErrorKind};

/// What the retry controller should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then attempt again.
    Retry(Duration),
    /// The error is retryable but the retry budget is spent.
    Exhausted,
    /// The error kind is never retried.
    NotRetryable,
}

/// Policy for retry behavior.
///
/// Combines the retry cap with the backoff strategy used for server and
/// network errors. A server supplied `Retry-After` is honoured as given unless
/// a ceiling is set with [`with_max_retry_after`](Self::with_max_retry_after).
#[derive(Clone)]
pub struct RetryPolicy {
    pub(crate) max_retries: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) max_retry_after: Option<Duration>,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(max_retries: usize, interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            max_retries,
            interval_fn,
            max_retry_after: None,
        }
    }

    /// Caps how long a `Retry-After` wait may be. Uncapped by default.
    pub fn with_max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = Some(max);
        self
    }

    /// Maximum number of retries after the initial attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Decides the next step after `retries` retries have already been made.
    pub fn decide(&self, error: &ClassifiedError, retries: usize) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::NotRetryable;
        }
        if retries >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        RetryDecision::Retry(self.delay_for(error, retries))
    }

    /// Computes the delay before retry number `retries` (0-indexed).
    pub fn delay_for(&self, error: &ClassifiedError, retries: usize) -> Duration {
        match (error.kind(), error.retry_after()) {
            (ErrorKind::RateLimited, Some(wait)) => match self.max_retry_after {
                Some(max) => wait.min(max),
                None => wait,
            },
            _ => self.interval_fn.next_interval(retries),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Arc::new(ExponentialBackoff::default()))
    }
}
