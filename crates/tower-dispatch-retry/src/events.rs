use std::time::{Duration, Instant};
use tower_dispatch_core::{DispatchEvent, ErrorKind};

/// Events emitted by the retry controller.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry is about to be made after `delay`.
    Retry {
        component_name: String,
        timestamp: Instant,
        /// 1-indexed retry number (1 = first retry).
        attempt: usize,
        delay: Duration,
        kind: ErrorKind,
    },
    /// The operation succeeded (either on first try or after retries).
    Success {
        component_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The operation failed after exhausting all retries.
    Exhausted {
        component_name: String,
        timestamp: Instant,
        attempts: usize,
        kind: ErrorKind,
    },
    /// The operation failed with a kind that is never retried.
    NotRetryable {
        component_name: String,
        timestamp: Instant,
        kind: ErrorKind,
    },
}

impl DispatchEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "retry_success",
            RetryEvent::Exhausted { .. } => "retry_exhausted",
            RetryEvent::NotRetryable { .. } => "retry_not_retryable",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::NotRetryable { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            RetryEvent::Retry { component_name, .. }
            | RetryEvent::Success { component_name, .. }
            | RetryEvent::Exhausted { component_name, .. }
            | RetryEvent::NotRetryable { component_name, .. } => component_name,
        }
    }
}
