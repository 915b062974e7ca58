//! Client-side outbound request orchestration.
//!
//! Every network call passes through one layer that:
//!
//! - bounds concurrent in-flight requests and admits the rest in FIFO order
//!   ([`scheduler`])
//! - caches idempotent reads with time-based expiry ([`cache`])
//! - retries rate-limited, server and network failures with capped exponential
//!   backoff ([`retry`])
//! - attaches credentials and correlation ids, and classifies failures
//!   ([`interceptor`])
//!
//! [`Dispatcher`] wires all four around an HTTP transport `Service`.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tower_dispatch::prelude::*;
//!
//! # async fn example() -> Result<(), ClassifiedError> {
//! let transport = tower::service_fn(|req: http::Request<()>| async move {
//!     let body = format!("GET {}", req.uri());
//!     Ok::<_, std::io::Error>(http::Response::new(body))
//! });
//!
//! let credentials = Arc::new(InMemoryCredentialStore::with_token("secret"));
//! let dispatcher = Dispatcher::new(
//!     transport,
//!     SchedulerConfig::default(),
//!     InterceptorConfig::builder()
//!         .credentials(credentials)
//!         .navigator(Arc::new(|| println!("-> /login")))
//!         .build(),
//! );
//!
//! let students = dispatcher
//!     .fetch(
//!         || http::Request::get("/students").body(()).unwrap_or_default(),
//!         "students:list",
//!         Duration::from_secs(300),
//!     )
//!     .await?;
//! assert_eq!(students, "GET /students");
//!
//! // Clears every cached read, then runs uncached.
//! dispatcher
//!     .mutate(|| http::Request::post("/students").body(()).unwrap_or_default())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `metrics`: Prometheus-style metrics in every component
//! - `tracing`: structured logging in every component
//! - `full`: both

pub use tower_dispatch_cache as cache;
pub use tower_dispatch_core as core;
pub use tower_dispatch_interceptor as interceptor;
pub use tower_dispatch_retry as retry;
pub use tower_dispatch_scheduler as scheduler;

mod settings;

pub use settings::{DispatchSettings, SettingsError};

use futures::future::BoxFuture;
use http::{Request, Response};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};
use tower_dispatch_core::{BoxError, ClassifiedError};
use tower_dispatch_interceptor::{
    Intercept, InterceptLayer, InterceptorConfig, InterceptorConfigBuilder,
};
use tower_dispatch_scheduler::{
    CurrentRuntime, Executor, Scheduler, SchedulerConfig, Submission, Task,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::{DispatchSettings, Dispatcher, SettingsError};
    pub use tower_dispatch_cache::{CacheConfig, ResponseCache};
    pub use tower_dispatch_core::{ClassifiedError, ErrorKind};
    pub use tower_dispatch_interceptor::{
        CredentialStore, InMemoryCredentialStore, InterceptLayer, InterceptorConfig, Navigator,
        TransportError,
    };
    pub use tower_dispatch_retry::{RetryConfig, RetryLayer};
    pub use tower_dispatch_scheduler::{Scheduler, SchedulerConfig, Submission, Task};
}

/// A scheduler and an intercepted transport behind one entry point.
///
/// Requests are described by factories (`Fn() -> http::Request<B>`) so each
/// retry sends a freshly built request. Results are response bodies.
pub struct Dispatcher<S, E: Executor = CurrentRuntime> {
    scheduler: Scheduler<E>,
    transport: Intercept<S>,
}

impl<S> Dispatcher<S, CurrentRuntime> {
    /// Creates a dispatcher whose tasks run on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a tokio runtime.
    pub fn new(transport: S, scheduler: SchedulerConfig, interceptor: InterceptorConfig) -> Self {
        Self::with_scheduler(transport, Scheduler::new(scheduler), interceptor)
    }

    /// Creates a dispatcher from validated settings.
    ///
    /// Credentials and navigation are taken from `interceptor`; its timeout and
    /// rate-limit default are overridden by `settings`.
    pub fn from_settings(
        transport: S,
        settings: &DispatchSettings,
        interceptor: InterceptorConfigBuilder,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self::new(
            transport,
            settings.scheduler_config(),
            settings.apply_to_interceptor(interceptor).build(),
        ))
    }
}

impl<S, E: Executor> Dispatcher<S, E> {
    /// Creates a dispatcher over an existing scheduler.
    pub fn with_scheduler(
        transport: S,
        scheduler: Scheduler<E>,
        interceptor: InterceptorConfig,
    ) -> Self {
        Self {
            scheduler,
            transport: InterceptLayer::new(interceptor).layer(transport),
        }
    }

    /// The underlying scheduler.
    pub fn scheduler(&self) -> &Scheduler<E> {
        &self.scheduler
    }

    /// Removes every cached read.
    pub fn clear_cache(&self) {
        self.scheduler.clear_cache();
    }
}

impl<S, E> Dispatcher<S, E>
where
    S: Clone + Send + 'static,
    E: Executor,
{
    /// A cached read kept for `ttl`.
    pub fn fetch<F, B, R>(
        &self,
        request_fn: F,
        cache_key: impl Into<String>,
        ttl: Duration,
    ) -> Submission<R>
    where
        F: Fn() -> Request<B> + Send + 'static,
        S: Service<Request<B>, Response = Response<R>>,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
        B: Send + 'static,
        R: Clone + Send + Sync + 'static,
    {
        self.scheduler
            .submit(Task::read(cache_key, ttl, self.execute(request_fn)))
    }

    /// A cached read kept for the cache's default TTL.
    pub fn fetch_default<F, B, R>(&self, request_fn: F, cache_key: impl Into<String>) -> Submission<R>
    where
        F: Fn() -> Request<B> + Send + 'static,
        S: Service<Request<B>, Response = Response<R>>,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
        B: Send + 'static,
        R: Clone + Send + Sync + 'static,
    {
        self.scheduler
            .submit(Task::read_default(cache_key, self.execute(request_fn)))
    }

    /// A cached read of time-sensitive data, kept for the short TTL.
    pub fn fetch_live<F, B, R>(&self, request_fn: F, cache_key: impl Into<String>) -> Submission<R>
    where
        F: Fn() -> Request<B> + Send + 'static,
        S: Service<Request<B>, Response = Response<R>>,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
        B: Send + 'static,
        R: Clone + Send + Sync + 'static,
    {
        self.scheduler
            .submit(Task::live(cache_key, self.execute(request_fn)))
    }

    /// A create, update or delete. Clears the cache, then runs uncached.
    pub fn mutate<F, B, R>(&self, request_fn: F) -> Submission<R>
    where
        F: Fn() -> Request<B> + Send + 'static,
        S: Service<Request<B>, Response = Response<R>>,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
        B: Send + 'static,
        R: Clone + Send + Sync + 'static,
    {
        self.scheduler
            .submit(Task::mutation(self.execute(request_fn)))
    }

    fn execute<F, B, R>(
        &self,
        request_fn: F,
    ) -> impl FnMut() -> BoxFuture<'static, Result<R, ClassifiedError>> + Send + 'static
    where
        F: Fn() -> Request<B> + Send + 'static,
        S: Service<Request<B>, Response = Response<R>>,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
        B: Send + 'static,
        R: Send + 'static,
    {
        let transport = self.transport.clone();
        move || -> BoxFuture<'static, Result<R, ClassifiedError>> {
            let service = transport.clone();
            let request = request_fn();
            Box::pin(async move {
                service
                    .oneshot(request)
                    .await
                    .map(Response::into_body)
            })
        }
    }
}

impl<S: Clone, E: Executor> Clone for Dispatcher<S, E> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            transport: self.transport.clone(),
        }
    }
}
