//! Classified errors for outbound requests.
//!
//! Every failure that reaches a caller of the dispatch layer is a
//! [`ClassifiedError`]. The interceptor pipeline produces it from a raw
//! transport outcome, the retry controller reads its [`ErrorKind`] to decide
//! whether another attempt is allowed, and UI code renders it with
//! [`ClassifiedError::user_message`].
//!
//! # Propagation
//!
//! | Kind | Retried locally? | Side effect |
//! |------|------------------|-------------|
//! | `RateLimited` | yes, after `retry_after` | - |
//! | `ServerError` | yes, exponential backoff | - |
//! | `NetworkError` | yes, exponential backoff | - |
//! | `ClientError` | no | - |
//! | `Unauthenticated` | no | credentials cleared, login redirect |
//! | `Aborted` | no | - |
//!
//! ```
//! use tower_dispatch_core::{ClassifiedError, ErrorKind};
//! use std::time::Duration;
//!
//! let err = ClassifiedError::rate_limited(Some(Duration::from_secs(2)));
//! assert_eq!(err.kind(), ErrorKind::RateLimited);
//! assert!(err.is_retryable());
//! assert_eq!(err.retry_after_seconds(), Some(2));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Boxed error type used for transport causes.
pub type BoxError = Box<dyn StdError + Send + Sync>;

type SharedCause = Arc<dyn StdError + Send + Sync>;

/// The classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 429. Retried after the server supplied (or default) wait.
    RateLimited,
    /// HTTP 5xx. Retried with exponential backoff.
    ServerError,
    /// No HTTP response at all: connection failure or timeout.
    NetworkError,
    /// HTTP 4xx other than 401 and 429. Never retried.
    ClientError,
    /// HTTP 401. Never retried; triggers the unauthenticated handler.
    Unauthenticated,
    /// The worker running the task stopped before producing an outcome.
    Aborted,
}

impl ErrorKind {
    /// Returns `true` if failures of this kind may be retried.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::ServerError | ErrorKind::NetworkError
        )
    }

    /// Stable snake_case label, used for log fields and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServerError => "server_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::ClientError => "client_error",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request, classified for retry decisions and user messaging.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    kind: ErrorKind,
    status: Option<u16>,
    retry_after: Option<Duration>,
    cause: Option<SharedCause>,
}

impl ClassifiedError {
    /// Creates an error of the given kind with no further detail.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            status: None,
            retry_after: None,
            cause: None,
        }
    }

    /// HTTP 429 with the wait the server asked for, if any.
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self {
            status: Some(429),
            retry_after,
            ..Self::new(ErrorKind::RateLimited)
        }
    }

    /// An HTTP 5xx response.
    pub fn server_error(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ErrorKind::ServerError)
        }
    }

    /// A failure where no HTTP response was received.
    pub fn network_error(cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::NetworkError).with_cause(cause)
    }

    /// An HTTP 4xx response other than 401 and 429.
    pub fn client_error(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ErrorKind::ClientError)
        }
    }

    /// An HTTP 401 response.
    pub fn unauthenticated() -> Self {
        Self {
            status: Some(401),
            ..Self::new(ErrorKind::Unauthenticated)
        }
    }

    /// The task was abandoned by its worker (panic or runtime shutdown).
    pub fn aborted(cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Aborted).with_cause(cause)
    }

    /// Attaches the underlying cause.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    /// Returns the classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the wait requested by a rate-limited response.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Returns the requested wait in whole seconds, rounded up.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.retry_after.map(ceil_secs)
    }

    /// Returns the underlying transport cause, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Returns `true` if the retry controller may try again.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Human-readable message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::RateLimited => match self.retry_after_seconds() {
                Some(1) => "Too many requests. Please wait 1 second and try again.".to_string(),
                Some(secs) => {
                    format!("Too many requests. Please wait {secs} seconds and try again.")
                }
                None => "Too many requests. Please wait a moment and try again.".to_string(),
            },
            ErrorKind::ServerError => {
                "The server encountered an error. Please try again later.".to_string()
            }
            ErrorKind::NetworkError => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ErrorKind::ClientError => match self.status {
                Some(403) => "You do not have permission to perform this action.".to_string(),
                Some(404) => "The requested resource was not found.".to_string(),
                _ => "The request could not be completed.".to_string(),
            },
            ErrorKind::Unauthenticated => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ErrorKind::Aborted => "The request was interrupted before it completed.".to_string(),
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.status) {
            (ErrorKind::RateLimited, _) => match self.retry_after {
                Some(d) => write!(f, "rate limited, retry after {:?}", d)?,
                None => write!(f, "rate limited")?,
            },
            (kind, Some(status)) => write!(f, "{} (status {})", kind, status)?,
            (kind, None) => write!(f, "{}", kind)?,
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl StdError for ClassifiedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}
