use std::time::Duration;
use thiserror::Error;
use tower_dispatch_core::BoxError;

/// A failure that produced no HTTP response.
///
/// Every variant classifies as `NetworkError` and is retried under the same
/// policy as server errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established or was reset.
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    /// No response arrived within the per-call timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(#[source] BoxError),
}

impl TransportError {
    /// Wraps a connection-level failure.
    pub fn connect(err: impl Into<BoxError>) -> Self {
        TransportError::Connect(err.into())
    }

    /// Returns true if the call ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}
