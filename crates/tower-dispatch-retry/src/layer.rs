use crate::{Retry, RetryConfig, RetryController};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that applies retry logic to a service.
///
/// # Examples
///
/// ```
/// use tower_dispatch_core::ClassifiedError;
/// use tower_dispatch_retry::{RetryConfig, RetryLayer};
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// let retry_layer = RetryLayer::new(
///     RetryConfig::builder()
///         .max_retries(5)
///         .base_delay(Duration::from_millis(100))
///         .build(),
/// );
///
/// let service = ServiceBuilder::new()
///     .layer(retry_layer)
///     .service(tower::service_fn(|req: String| async move {
///         Ok::<_, ClassifiedError>(req)
///     }));
/// ```
#[derive(Clone)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    /// Creates a new `RetryLayer` with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    pub fn builder() -> crate::RetryConfigBuilder {
        crate::RetryConfigBuilder::new()
    }

    /// Returns a controller sharing this layer's configuration.
    pub fn controller(&self) -> RetryController {
        RetryController::from_shared(Arc::clone(&self.config))
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, self.controller())
    }
}
