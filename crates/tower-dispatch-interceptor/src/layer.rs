use crate::{Intercept, InterceptorConfig, InterceptorConfigBuilder};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that runs the interceptor pipeline around a transport.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tower::ServiceBuilder;
/// use tower_dispatch_interceptor::{InMemoryCredentialStore, InterceptLayer};
///
/// let credentials = Arc::new(InMemoryCredentialStore::with_token("secret"));
///
/// let config = InterceptLayer::builder()
///     .credentials(credentials)
///     .navigator(Arc::new(|| println!("redirecting to /login")))
///     .build();
///
/// let service = ServiceBuilder::new().layer(InterceptLayer::new(config)).service(
///     tower::service_fn(|_req: http::Request<()>| async move {
///         Ok::<_, std::io::Error>(http::Response::new("ok"))
///     }),
/// );
/// ```
#[derive(Clone)]
pub struct InterceptLayer {
    config: Arc<InterceptorConfig>,
}

impl InterceptLayer {
    /// Creates a new layer with the given configuration.
    pub fn new(config: InterceptorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring the interceptor.
    pub fn builder() -> InterceptorConfigBuilder {
        InterceptorConfigBuilder::new()
    }
}

impl<S> Layer<S> for InterceptLayer {
    type Service = Intercept<S>;

    fn layer(&self, service: S) -> Self::Service {
        Intercept::new(service, Arc::clone(&self.config))
    }
}
