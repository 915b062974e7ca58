//! Interceptor pipeline for outbound HTTP requests.
//!
//! [`Intercept`] wraps any HTTP transport `Service` and runs two independent
//! phases around every call.
//!
//! **Outbound**, before the transport is invoked:
//! - the bearer token from the [`CredentialStore`] (if any) is attached as
//!   `Authorization: Bearer <token>`
//! - a fresh correlation id is attached as `x-correlation-id`
//!
//! **Inbound**, on every outcome:
//! - responses below 400 pass through unchanged
//! - `429` becomes `RateLimited` with the `Retry-After` wait (default 1s)
//! - `5xx` becomes `ServerError`
//! - `401` becomes `Unauthenticated` and runs the [`UnauthenticatedHandler`]
//!   exactly once (by default: clear credentials, redirect to login)
//! - other `4xx` become `ClientError`
//! - transport failures and calls exceeding the request timeout (30s) become
//!   `NetworkError`
//!
//! The service error type is always [`ClassifiedError`], so the pipeline
//! composes directly with the retry controller.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use tower::{Layer, ServiceExt};
//! use tower_dispatch_core::ErrorKind;
//! use tower_dispatch_interceptor::{InMemoryCredentialStore, InterceptLayer};
//!
//! # async fn example() {
//! let credentials = Arc::new(InMemoryCredentialStore::with_token("expired"));
//!
//! let layer = InterceptLayer::new(
//!     InterceptLayer::builder()
//!         .credentials(credentials.clone())
//!         .navigator(Arc::new(|| println!("-> /login")))
//!         .build(),
//! );
//!
//! let transport = tower::service_fn(|_req: http::Request<()>| async {
//!     let response = http::Response::builder().status(401).body(()).unwrap();
//!     Ok::<_, std::io::Error>(response)
//! });
//!
//! let err = layer
//!     .layer(transport)
//!     .oneshot(http::Request::new(()))
//!     .await
//!     .unwrap_err();
//!
//! assert_eq!(err.kind(), ErrorKind::Unauthenticated);
//! # }
//! ```

mod auth;
mod classify;
mod config;
mod correlation;
mod credentials;
mod error;
mod events;
mod layer;

pub use auth::{ClearCredentialsAndRedirect, FnHandler, Navigator, UnauthenticatedHandler};
pub use classify::{
    classify_response, classify_transport_error, parse_retry_after, DEFAULT_RETRY_AFTER,
};
pub use config::{InterceptorConfig, InterceptorConfigBuilder, DEFAULT_REQUEST_TIMEOUT};
pub use correlation::{generate as generate_correlation_id, CORRELATION_HEADER};
pub use credentials::{CredentialStore, InMemoryCredentialStore};
pub use error::TransportError;
pub use events::InterceptorEvent;
pub use layer::InterceptLayer;

use futures::future::BoxFuture;
use http::header::AUTHORIZATION;
use http::{HeaderValue, Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;
use tower_dispatch_core::{BoxError, ClassifiedError, ErrorKind};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// A Tower service that runs the interceptor pipeline around an HTTP
/// transport.
pub struct Intercept<S> {
    inner: S,
    config: Arc<InterceptorConfig>,
}

impl<S> Intercept<S> {
    pub(crate) fn new(inner: S, config: Arc<InterceptorConfig>) -> Self {
        #[cfg(feature = "metrics")]
        describe_counter!(
            "interceptor_errors_total",
            "Total number of classified transport failures by kind"
        );

        Self { inner, config }
    }

    /// Returns the interceptor configuration.
    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }
}

impl<S: Clone> Clone for Intercept<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Intercept<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = ClassifiedError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|err| classify_transport_error(err.into()))
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let correlation_id = prepare(&config, &mut req);

        #[cfg(feature = "tracing")]
        debug!(
            interceptor = %config.name,
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
            "Dispatching request"
        );

        let response = self.inner.call(req);

        Box::pin(async move {
            let error = match tokio::time::timeout(config.request_timeout, response).await {
                Ok(Ok(response)) => match classify_response(
                    response.status(),
                    response.headers(),
                    config.rate_limit_default,
                ) {
                    None => return Ok(response),
                    Some(error) => error,
                },
                Ok(Err(err)) => classify_transport_error(err.into()),
                Err(_elapsed) => {
                    ClassifiedError::network_error(TransportError::Timeout(config.request_timeout))
                }
            };

            record_failure(&config, &correlation_id, &error);
            Err(error)
        })
    }
}

/// Outbound phase. Returns the correlation id the request carries.
fn prepare<B>(config: &InterceptorConfig, req: &mut Request<B>) -> String {
    if let Some(token) = config.credentials.as_ref().and_then(|store| store.token()) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                req.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                warn!(interceptor = %config.name, "Stored token is not a valid header value");
            }
        }
    }

    let existing = req
        .headers()
        .get(&config.correlation_header)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match existing {
        Some(id) => id,
        None => {
            let id = correlation::generate();
            if let Ok(value) = HeaderValue::from_str(&id) {
                req.headers_mut()
                    .insert(config.correlation_header.clone(), value);
            }
            id
        }
    }
}

/// Inbound phase side effects for a failed call.
fn record_failure(config: &InterceptorConfig, correlation_id: &str, error: &ClassifiedError) {
    #[cfg(feature = "metrics")]
    counter!("interceptor_errors_total", "interceptor" => config.name.clone(), "kind" => error.kind().as_str())
        .increment(1);

    #[cfg(feature = "tracing")]
    debug!(
        interceptor = %config.name,
        correlation_id,
        kind = %error.kind(),
        status = ?error.status(),
        "Request failed"
    );

    config.event_listeners.emit(&InterceptorEvent::ErrorClassified {
        component_name: config.name.clone(),
        timestamp: Instant::now(),
        correlation_id: correlation_id.to_string(),
        kind: error.kind(),
        status: error.status(),
    });

    if error.kind() == ErrorKind::Unauthenticated {
        #[cfg(feature = "tracing")]
        warn!(
            interceptor = %config.name,
            correlation_id,
            "Credentials rejected, redirecting to login"
        );

        if let Some(handler) = &config.unauthenticated {
            handler.on_unauthenticated();
        }

        config.event_listeners.emit(&InterceptorEvent::Unauthenticated {
            component_name: config.name.clone(),
            timestamp: Instant::now(),
            correlation_id: correlation_id.to_string(),
        });
    }
}
