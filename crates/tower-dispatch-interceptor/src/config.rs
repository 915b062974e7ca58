use crate::auth::{ClearCredentialsAndRedirect, FnHandler, Navigator, UnauthenticatedHandler};
use crate::classify::DEFAULT_RETRY_AFTER;
use crate::correlation::CORRELATION_HEADER;
use crate::credentials::CredentialStore;
use crate::events::InterceptorEvent;
use http::HeaderName;
use std::sync::Arc;
use std::time::Duration;
use tower_dispatch_core::{ErrorKind, EventListeners, FnListener};

/// Default wall-clock bound on a single transport call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the interceptor pipeline.
#[derive(Clone)]
pub struct InterceptorConfig {
    pub(crate) credentials: Option<Arc<dyn CredentialStore>>,
    pub(crate) unauthenticated: Option<Arc<dyn UnauthenticatedHandler>>,
    pub(crate) correlation_header: HeaderName,
    pub(crate) request_timeout: Duration,
    pub(crate) rate_limit_default: Duration,
    pub(crate) event_listeners: EventListeners<InterceptorEvent>,
    pub(crate) name: String,
}

impl InterceptorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> InterceptorConfigBuilder {
        InterceptorConfigBuilder::new()
    }

    /// Bound on a single transport call.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Wait assumed for a `429` without a usable `Retry-After`.
    pub fn rate_limit_default(&self) -> Duration {
        self.rate_limit_default
    }

    /// Header the correlation id is written to.
    pub fn correlation_header(&self) -> &HeaderName {
        &self.correlation_header
    }
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        InterceptorConfigBuilder::new().build()
    }
}

/// Builder for [`InterceptorConfig`].
pub struct InterceptorConfigBuilder {
    credentials: Option<Arc<dyn CredentialStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    unauthenticated: Option<Arc<dyn UnauthenticatedHandler>>,
    correlation_header: HeaderName,
    request_timeout: Duration,
    rate_limit_default: Duration,
    event_listeners: EventListeners<InterceptorEvent>,
    name: String,
}

impl Default for InterceptorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptorConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - no credential store, no navigator
    /// - correlation header: `x-correlation-id`
    /// - request_timeout: 30s
    /// - rate_limit_default: 1s
    pub fn new() -> Self {
        Self {
            credentials: None,
            navigator: None,
            unauthenticated: None,
            correlation_header: HeaderName::from_static(CORRELATION_HEADER),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limit_default: DEFAULT_RETRY_AFTER,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the store the bearer token is read from.
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Sets the collaborator that redirects to the login entry point.
    ///
    /// Unless a custom handler is installed, a `401` clears the credential
    /// store and then calls this navigator.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Replaces the default clear-and-redirect behavior on `401`.
    pub fn unauthenticated_handler<H>(mut self, handler: H) -> Self
    where
        H: UnauthenticatedHandler + 'static,
    {
        self.unauthenticated = Some(Arc::new(handler));
        self
    }

    /// Sets the header the correlation id is written to.
    pub fn correlation_header(mut self, header: HeaderName) -> Self {
        self.correlation_header = header;
        self
    }

    /// Sets the bound on a single transport call.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the wait assumed for a `429` without a usable `Retry-After`.
    ///
    /// Default: 1 second
    pub fn rate_limit_default(mut self, wait: Duration) -> Self {
        self.rate_limit_default = wait;
        self
    }

    /// Sets the name for this interceptor instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for every classified failure.
    ///
    /// # Callback Signature
    /// `Fn(ErrorKind, Option<u16>)` - the kind and HTTP status, if a response
    /// was received.
    pub fn on_error_classified<F>(mut self, f: F) -> Self
    where
        F: Fn(ErrorKind, Option<u16>) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InterceptorEvent::ErrorClassified { kind, status, .. } = event {
                f(*kind, *status);
            }
        }));
        self
    }

    /// Registers a callback after the unauthenticated handler has run.
    ///
    /// # Callback Signature
    /// `Fn(&str)` - the correlation id of the rejected request.
    pub fn on_unauthenticated<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InterceptorEvent::Unauthenticated { correlation_id, .. } = event {
                f(correlation_id);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> InterceptorConfig {
        let fallback: Option<Arc<dyn UnauthenticatedHandler>> =
            match (self.credentials.clone(), self.navigator) {
                (Some(credentials), Some(navigator)) => Some(Arc::new(
                    ClearCredentialsAndRedirect::new(credentials, navigator),
                )),
                (Some(credentials), None) => Some(Arc::new(FnHandler::new(move || {
                    credentials.clear_token()
                }))),
                (None, Some(navigator)) => Some(Arc::new(FnHandler::new(move || {
                    navigator.redirect_to_login()
                }))),
                (None, None) => None,
            };
        let unauthenticated = self.unauthenticated.or(fallback);

        InterceptorConfig {
            credentials: self.credentials,
            unauthenticated,
            correlation_header: self.correlation_header,
            request_timeout: self.request_timeout,
            rate_limit_default: self.rate_limit_default,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
