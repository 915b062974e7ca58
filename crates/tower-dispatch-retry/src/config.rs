use crate::backoff::{ExponentialBackoff, IntervalFunction};
use crate::events::RetryEvent;
use crate::policy::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tower_dispatch_core::{ErrorKind, EventListeners, FnListener};

/// Configuration for the retry controller.
#[derive(Clone)]
pub struct RetryConfig {
    pub(crate) policy: RetryPolicy,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Returns the retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfigBuilder::new().build()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_retry_after: Option<Duration>,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_retries: 3
    /// - backoff: exponential, 1s base, multiplier 2, capped at 10s
    /// - max_retry_after: none, `Retry-After` is honoured as given
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            max_retry_after: None,
            interval_fn: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the maximum number of retries.
    ///
    /// This excludes the initial attempt, so max_retries=3 means
    /// 1 initial attempt + up to 3 retries.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the cap on exponential growth.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor between consecutive retries.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps how long a server supplied `Retry-After` may park a task.
    ///
    /// Default: no cap
    pub fn max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = Some(max);
        self
    }

    /// Replaces the exponential schedule with a custom interval function.
    ///
    /// When set, `base_delay`, `max_delay` and `multiplier` are ignored.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Sets the name for this retry instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a retry attempt is about to be made.
    ///
    /// This callback is invoked after a failed attempt and before the retry
    /// delay begins.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)` - Called with two parameters:
    /// - First parameter: The retry number (1-indexed, so 1 = first retry)
    /// - Second parameter: The delay duration before the next attempt
    ///
    /// # Example
    /// ```rust,no_run
    /// use tower_dispatch_retry::RetryConfig;
    ///
    /// let config = RetryConfig::builder()
    ///     .on_retry(|attempt, delay| {
    ///         println!("Retry {} after {:?}", attempt, delay);
    ///     })
    ///     .build();
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback when an operation succeeds.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the total number of attempts made (including
    /// the initial attempt).
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when all retries are exhausted.
    ///
    /// # Callback Signature
    /// `Fn(usize, ErrorKind)` - Called with the total number of attempts made
    /// and the kind of the last error, which is returned to the caller.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, ErrorKind) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, kind, .. } = event {
                f(*attempts, *kind);
            }
        }));
        self
    }

    /// Registers a callback when an error is surfaced without retrying.
    pub fn on_not_retryable<F>(mut self, f: F) -> Self
    where
        F: Fn(ErrorKind) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::NotRetryable { kind, .. } = event {
                f(*kind);
            }
        }));
        self
    }

    /// Builds the retry configuration.
    pub fn build(self) -> RetryConfig {
        let interval_fn = self.interval_fn.unwrap_or_else(|| {
            Arc::new(
                ExponentialBackoff::new(self.base_delay)
                    .multiplier(self.multiplier)
                    .max_interval(self.max_delay),
            )
        });

        let mut policy = RetryPolicy::new(self.max_retries, interval_fn);
        if let Some(max) = self.max_retry_after {
            policy = policy.with_max_retry_after(max);
        }

        RetryConfig {
            policy,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
