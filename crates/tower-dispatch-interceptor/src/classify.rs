//! Mapping of raw transport outcomes onto [`ClassifiedError`].

use crate::error::TransportError;
use http::header::RETRY_AFTER;
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use tower_dispatch_core::{BoxError, ClassifiedError};

/// Wait applied to a `429` response that carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Classifies a response status.
///
/// Returns `None` for anything below 400, which passes through unchanged.
pub fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    default_retry_after: Duration,
) -> Option<ClassifiedError> {
    let code = status.as_u16();
    let error = match status {
        StatusCode::TOO_MANY_REQUESTS => ClassifiedError::rate_limited(Some(
            parse_retry_after(headers).unwrap_or(default_retry_after),
        )),
        StatusCode::UNAUTHORIZED => ClassifiedError::unauthenticated(),
        s if s.is_server_error() || code >= 600 => ClassifiedError::server_error(code),
        s if s.is_client_error() => ClassifiedError::client_error(code),
        _ => return None,
    };
    Some(error)
}

/// Classifies an error raised by the transport itself.
///
/// An already classified error passes through untouched. Anything else had no
/// HTTP response and becomes `NetworkError`.
pub fn classify_transport_error(err: BoxError) -> ClassifiedError {
    let err = match err.downcast::<ClassifiedError>() {
        Ok(classified) => return *classified,
        Err(err) => err,
    };

    match err.downcast::<TransportError>() {
        Ok(transport) => ClassifiedError::network_error(*transport),
        Err(other) => ClassifiedError::network_error(TransportError::Other(other)),
    }
}

/// Parses `Retry-After` given as delta-seconds.
///
/// HTTP-date values and garbage yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
