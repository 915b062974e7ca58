use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tower_dispatch_core::ClassifiedError;

pub(crate) type Execute<T> =
    Box<dyn FnMut() -> BoxFuture<'static, Result<T, ClassifiedError>> + Send>;

/// How long a successful result stays cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The cache's default TTL (5 minutes unless configured).
    Default,
    /// The cache's short TTL for high-churn data (1 minute unless configured).
    Short,
    /// An explicit TTL.
    Fixed(Duration),
}

/// A unit of submitted work.
///
/// `execute` is invoked once per attempt, so a retried task re-runs the same
/// factory rather than re-polling a finished future. Tasks with a cache key
/// must be idempotent reads; tasks without one are never cached.
pub struct Task<T> {
    pub(crate) execute: Execute<T>,
    pub(crate) cache_key: Option<String>,
    pub(crate) ttl: Ttl,
    pub(crate) mutation: bool,
}

impl<T> Task<T> {
    fn new<F, Fut>(mut execute: F, cache_key: Option<String>, ttl: Ttl, mutation: bool) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send + 'static,
    {
        Self {
            execute: Box::new(move || -> BoxFuture<'static, Result<T, ClassifiedError>> {
                Box::pin(execute())
            }),
            cache_key,
            ttl,
            mutation,
        }
    }

    /// A cacheable read kept for `ttl`.
    pub fn read<F, Fut>(key: impl Into<String>, ttl: Duration, execute: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send + 'static,
    {
        Self::new(execute, Some(key.into()), Ttl::Fixed(ttl), false)
    }

    /// A cacheable read kept for the cache's default TTL.
    pub fn read_default<F, Fut>(key: impl Into<String>, execute: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send + 'static,
    {
        Self::new(execute, Some(key.into()), Ttl::Default, false)
    }

    /// A cacheable read of time-sensitive data, kept for the short TTL.
    pub fn live<F, Fut>(key: impl Into<String>, execute: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send + 'static,
    {
        Self::new(execute, Some(key.into()), Ttl::Short, false)
    }

    /// A create, update or delete. Clears the whole cache on submission and
    /// again right before it executes.
    pub fn mutation<F, Fut>(execute: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send + 'static,
    {
        Self::new(execute, None, Ttl::Default, true)
    }

    /// Work that is neither cached nor invalidating.
    pub fn uncached<F, Fut>(execute: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send + 'static,
    {
        Self::new(execute, None, Ttl::Default, false)
    }

    /// The cache key, if the result may be cached.
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    /// Whether submitting this task invalidates the cache.
    pub fn is_mutation(&self) -> bool {
        self.mutation
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("cache_key", &self.cache_key)
            .field("ttl", &self.ttl)
            .field("mutation", &self.mutation)
            .finish_non_exhaustive()
    }
}
