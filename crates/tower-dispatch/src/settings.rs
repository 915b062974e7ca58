//! Serde-loadable settings for a whole dispatch stack.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tower_dispatch_cache::CacheConfig;
use tower_dispatch_interceptor::InterceptorConfigBuilder;
use tower_dispatch_retry::RetryConfig;
use tower_dispatch_scheduler::SchedulerConfig;

/// Errors returned by [`DispatchSettings::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// `max_concurrent_requests` was zero.
    #[error("max_concurrent_requests must be at least 1")]
    ZeroConcurrency,

    /// `request_timeout_ms` was zero.
    #[error("request_timeout_ms must be greater than zero")]
    ZeroTimeout,

    /// The backoff multiplier would shrink delays or is not a number.
    #[error("multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),

    /// The first retry would wait longer than the cap.
    #[error("base_delay_ms ({base_ms}) exceeds max_delay_ms ({max_ms})")]
    DelayOrder { base_ms: u64, max_ms: u64 },
}

/// Construction-time settings, with every duration in milliseconds.
///
/// Missing keys take the defaults below.
///
/// ```
/// use tower_dispatch::DispatchSettings;
///
/// let settings: DispatchSettings =
///     serde_json::from_str(r#"{ "max_concurrent_requests": 2, "max_retries": 5 }"#).unwrap();
///
/// assert_eq!(settings.max_concurrent_requests, 2);
/// assert_eq!(settings.base_delay_ms, 1_000);
/// settings.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Default: 5
    pub max_concurrent_requests: usize,
    /// Default: 3
    pub max_retries: usize,
    /// Default: 1000
    pub base_delay_ms: u64,
    /// Default: 10000
    pub max_delay_ms: u64,
    /// Default: 2.0
    pub multiplier: f64,
    /// Default: 30000
    pub request_timeout_ms: u64,
    /// Default: 300000
    pub default_ttl_ms: u64,
    /// Default: 60000
    pub short_ttl_ms: u64,
    /// Default: 1
    pub rate_limit_default_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            request_timeout_ms: 30_000,
            default_ttl_ms: 300_000,
            short_ttl_ms: 60_000,
            rate_limit_default_secs: 1,
        }
    }
}

impl DispatchSettings {
    /// Rejects settings that would stall or invert the schedule.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_concurrent_requests == 0 {
            return Err(SettingsError::ZeroConcurrency);
        }
        if self.request_timeout_ms == 0 {
            return Err(SettingsError::ZeroTimeout);
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(SettingsError::InvalidMultiplier(self.multiplier));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(SettingsError::DelayOrder {
                base_ms: self.base_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        Ok(())
    }

    /// Retry configuration derived from these settings.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::builder()
            .max_retries(self.max_retries)
            .base_delay(Duration::from_millis(self.base_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .multiplier(self.multiplier)
            .build()
    }

    /// Cache configuration derived from these settings.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::builder()
            .default_ttl(Duration::from_millis(self.default_ttl_ms))
            .short_ttl(Duration::from_millis(self.short_ttl_ms))
            .build()
    }

    /// Scheduler configuration derived from these settings.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::builder()
            .max_concurrent_requests(self.max_concurrent_requests)
            .cache(self.cache_config())
            .retry(self.retry_config())
            .build()
    }

    /// Applies the timeout and rate-limit default to an interceptor builder.
    pub fn apply_to_interceptor(&self, builder: InterceptorConfigBuilder) -> InterceptorConfigBuilder {
        builder
            .request_timeout(Duration::from_millis(self.request_timeout_ms))
            .rate_limit_default(Duration::from_secs(self.rate_limit_default_secs))
    }
}
