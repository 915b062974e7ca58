use crate::events::SchedulerEvent;
use tower_dispatch_cache::CacheConfig;
use tower_dispatch_core::{ErrorKind, EventListeners, FnListener};
use tower_dispatch_retry::RetryConfig;

/// Default bound on tasks executing at the same time.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Configuration for the scheduler.
#[derive(Clone)]
pub struct SchedulerConfig {
    pub(crate) max_concurrent_requests: usize,
    pub(crate) cache: CacheConfig,
    pub(crate) retry: RetryConfig,
    pub(crate) event_listeners: EventListeners<SchedulerEvent>,
    pub(crate) name: String,
}

impl SchedulerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::new()
    }

    /// Bound on tasks executing at the same time.
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfigBuilder::new().build()
    }
}

/// Builder for [`SchedulerConfig`].
pub struct SchedulerConfigBuilder {
    max_concurrent_requests: usize,
    cache: Option<CacheConfig>,
    retry: Option<RetryConfig>,
    event_listeners: EventListeners<SchedulerEvent>,
    name: String,
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_concurrent_requests: 5
    /// - cache: [`CacheConfig::default`] (5 minute default TTL, 1 minute short TTL)
    /// - retry: [`RetryConfig::default`] (3 retries, 1s base, x2, 10s cap)
    pub fn new() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            cache: None,
            retry: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the bound on tasks executing at the same time.
    ///
    /// Values below 1 are raised to 1 so the backlog always drains.
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    /// Sets the response cache configuration.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Sets the retry configuration applied to every executed task.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Sets the name for this scheduler instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a task is resolved from the cache.
    pub fn on_cache_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let SchedulerEvent::CacheHit { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback when a task takes a slot.
    ///
    /// # Callback Signature
    /// `Fn(u64, usize)` - the task id and the active count including this task.
    pub fn on_task_started<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let SchedulerEvent::TaskStarted {
                task_id,
                active_count,
                ..
            } = event
            {
                f(*task_id, *active_count);
            }
        }));
        self
    }

    /// Registers a callback when a task reaches a terminal state.
    ///
    /// # Callback Signature
    /// `Fn(u64, Option<ErrorKind>)` - the task id and the error kind, `None`
    /// on success.
    pub fn on_task_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, Option<ErrorKind>) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let SchedulerEvent::TaskFinished { task_id, error, .. } = event {
                f(*task_id, *error);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            cache: self.cache.unwrap_or_default(),
            retry: self.retry.unwrap_or_default(),
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
