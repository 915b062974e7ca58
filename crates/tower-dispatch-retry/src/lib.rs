//! Classification-driven retry for tower-dispatch.
//!
//! The retry controller wraps one logical request and re-executes it while
//! failures are transient:
//!
//! - `ClientError`, `Unauthenticated` and `Aborted` are surfaced on the first
//!   occurrence
//! - `ServerError` and `NetworkError` are retried after
//!   `min(base * multiplier^n, max)`
//! - `RateLimited` is retried after the server supplied `Retry-After`, or the
//!   exponential delay when the server gave none. An optional
//!   `max_retry_after` bounds the wait.
//!
//! After `max_retries` retries the last [`ClassifiedError`] is returned
//! unchanged. Each task is a bounded state machine
//! `Attempting(n) -> Success | Attempting(n + 1) | Failed` driven by a loop, so
//! there is no recursion and `n` never exceeds `max_retries`.
//!
//! # Examples
//!
//! ```
//! use tower_dispatch_core::ClassifiedError;
//! use tower_dispatch_retry::{RetryConfig, RetryController};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ClassifiedError> {
//! let controller = RetryController::new(
//!     RetryConfig::builder()
//!         .max_retries(3)
//!         .base_delay(Duration::from_secs(1))
//!         .max_delay(Duration::from_secs(10))
//!         .on_retry(|attempt, delay| println!("retry {attempt} in {delay:?}"))
//!         .build(),
//! );
//!
//! let body = controller
//!     .run(|| async { Ok::<_, ClassifiedError>("students".to_string()) })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The same controller is available as a Tower layer for any service whose
//! error type is [`ClassifiedError`]:
//!
//! ```
//! use tower::ServiceBuilder;
//! use tower_dispatch_core::ClassifiedError;
//! use tower_dispatch_retry::{RetryConfig, RetryLayer};
//!
//! let service = ServiceBuilder::new()
//!     .layer(RetryLayer::new(RetryConfig::default()))
//!     .service(tower::service_fn(|req: String| async move {
//!         Ok::<_, ClassifiedError>(format!("Response: {}", req))
//!     }));
//! ```

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryDecision, RetryPolicy};

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};
use tower_dispatch_core::ClassifiedError;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Runs an operation with classification-driven retries.
///
/// Cloning is cheap; clones share configuration and listeners.
#[derive(Clone)]
pub struct RetryController {
    config: Arc<RetryConfig>,
}

impl RetryController {
    /// Creates a controller from the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self::from_shared(Arc::new(config))
    }

    pub(crate) fn from_shared(config: Arc<RetryConfig>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "retry_calls_total",
                "Total number of retried operations by final result"
            );
            describe_counter!("retry_attempts_total", "Total number of retry attempts");
            describe_histogram!(
                "retry_attempts",
                "Number of attempts made per operation, initial attempt included"
            );
        }

        Self { config }
    }

    /// Returns the retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.config.policy
    }

    /// Runs `execute`, retrying transient failures.
    ///
    /// `execute` is invoked once per attempt. The future resolves to the first
    /// success, or to the last error once retries are exhausted or a
    /// non-retryable kind is seen.
    pub async fn run<F, Fut, T>(&self, mut execute: F) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClassifiedError>>,
    {
        let config = &self.config;
        let mut retries = 0;

        loop {
            let error = match execute().await {
                Ok(value) => {
                    self.record_finished("success", retries + 1);
                    config.event_listeners.emit(&RetryEvent::Success {
                        component_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: retries + 1,
                    });
                    return Ok(value);
                }
                Err(error) => error,
            };

            match config.policy.decide(&error, retries) {
                RetryDecision::Retry(delay) => {
                    #[cfg(feature = "metrics")]
                    counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                    #[cfg(feature = "tracing")]
                    debug!(
                        retry = %config.name,
                        attempt = retries + 1,
                        kind = %error.kind(),
                        delay = ?delay,
                        "Scheduling retry"
                    );

                    config.event_listeners.emit(&RetryEvent::Retry {
                        component_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempt: retries + 1,
                        delay,
                        kind: error.kind(),
                    });

                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                RetryDecision::Exhausted => {
                    self.record_finished("exhausted", retries + 1);

                    #[cfg(feature = "tracing")]
                    warn!(
                        retry = %config.name,
                        attempts = retries + 1,
                        kind = %error.kind(),
                        "Retries exhausted"
                    );

                    config.event_listeners.emit(&RetryEvent::Exhausted {
                        component_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: retries + 1,
                        kind: error.kind(),
                    });
                    return Err(error);
                }
                RetryDecision::NotRetryable => {
                    self.record_finished("not_retryable", retries + 1);
                    config.event_listeners.emit(&RetryEvent::NotRetryable {
                        component_name: config.name.clone(),
                        timestamp: Instant::now(),
                        kind: error.kind(),
                    });
                    return Err(error);
                }
            }
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record_finished(&self, result: &'static str, attempts: usize) {
        #[cfg(feature = "metrics")]
        {
            let name = self.config.name.clone();
            counter!("retry_calls_total", "retry" => name.clone(), "result" => result)
                .increment(1);
            histogram!("retry_attempts", "retry" => name).record(attempts as f64);
        }
    }
}

/// A Tower [`Service`] that retries failed requests.
///
/// Each retry re-issues a clone of the original request on a fresh clone of
/// the inner service.
pub struct Retry<S> {
    inner: S,
    controller: RetryController,
}

impl<S> Retry<S> {
    /// Creates a new `Retry` service wrapping the given service.
    pub fn new(inner: S, controller: RetryController) -> Self {
        Self { inner, controller }
    }
}

impl<S> Clone for Retry<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            controller: self.controller.clone(),
        }
    }
}

impl<S, Req> Service<Req> for Retry<S>
where
    S: Service<Req, Error = ClassifiedError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = ClassifiedError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let controller = self.controller.clone();

        // owned clones: neither `S` nor `Req` has to be `Sync`
        Box::pin(async move {
            controller
                .run(move || service.clone().oneshot(req.clone()))
                .await
        })
    }
}
