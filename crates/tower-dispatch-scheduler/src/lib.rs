//! Bounded-concurrency request scheduler.
//!
//! Every outbound call is submitted to a [`Scheduler`] as a [`Task`]. The
//! scheduler:
//!
//! 1. clears the cache if the task is a mutation
//! 2. resolves the task from the response cache when its key is fresh, without
//!    consuming a slot
//! 3. otherwise appends it to a FIFO backlog
//! 4. admits backlog entries while fewer than `max_concurrent_requests` tasks
//!    are active, running each through the retry controller
//! 5. on success writes the result to the cache (if keyed), releases the slot
//!    and admits the next entry
//!
//! Admission happens on every submission and every completion, so nothing has
//! to poll the scheduler. Completion order is not guaranteed; admission order
//! is.
//!
//! # Examples
//!
//! ```
//! use tower_dispatch_core::ClassifiedError;
//! use tower_dispatch_scheduler::{Scheduler, SchedulerConfig, Task};
//!
//! # async fn example() -> Result<(), ClassifiedError> {
//! let scheduler = Scheduler::new(
//!     SchedulerConfig::builder()
//!         .max_concurrent_requests(5)
//!         .name("api")
//!         .build(),
//! );
//!
//! // Cached for the default TTL.
//! let students: Vec<String> = scheduler
//!     .submit(Task::read_default("students:list", || async {
//!         Ok::<_, ClassifiedError>(vec!["ada".to_string()])
//!     }))
//!     .await?;
//!
//! // Clears the cache before it runs.
//! scheduler
//!     .submit(Task::mutation(|| async { Ok::<_, ClassifiedError>(()) }))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod events;
mod executor;
mod submission;
mod task;

pub use config::{SchedulerConfig, SchedulerConfigBuilder, DEFAULT_MAX_CONCURRENT_REQUESTS};
pub use events::SchedulerEvent;
pub use executor::{CurrentRuntime, Executor};
pub use submission::Submission;
pub use task::{Task, Ttl};

use futures::future::BoxFuture;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tower_dispatch_cache::ResponseCache;
use tower_dispatch_retry::RetryController;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

#[cfg(feature = "tracing")]
use tracing::debug;

type CachedValue = Arc<dyn Any + Send + Sync>;

type Job<E> = Box<dyn FnOnce(SlotGuard<E>) -> BoxFuture<'static, ()> + Send>;

/// Admits submitted tasks under a concurrency bound.
///
/// Cloning is cheap; clones share the backlog, the active count and the cache.
pub struct Scheduler<E: Executor = CurrentRuntime> {
    shared: Arc<Shared<E>>,
}

struct Shared<E: Executor> {
    config: SchedulerConfig,
    cache: ResponseCache<CachedValue>,
    retry: RetryController,
    executor: E,
    state: Mutex<State<E>>,
    next_task_id: AtomicU64,
}

struct State<E: Executor> {
    active: usize,
    backlog: VecDeque<Queued<E>>,
}

struct Queued<E: Executor> {
    task_id: u64,
    enqueued_at: tokio::time::Instant,
    job: Job<E>,
}

/// Holds one concurrency slot. Dropping it frees the slot and admits the
/// next backlog entry, even if the task panicked.
struct SlotGuard<E: Executor> {
    shared: Arc<Shared<E>>,
}

impl<E: Executor> Drop for SlotGuard<E> {
    fn drop(&mut self) {
        self.shared.release();
    }
}

impl Scheduler<CurrentRuntime> {
    /// Creates a scheduler that spawns tasks on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a tokio runtime.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_executor(config, CurrentRuntime::new())
    }
}

impl<E: Executor> Scheduler<E> {
    /// Creates a scheduler that spawns tasks on `executor`.
    pub fn with_executor(config: SchedulerConfig, executor: E) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "scheduler_tasks_submitted_total",
                "Total number of tasks submitted to the scheduler"
            );
            describe_gauge!(
                "scheduler_active_tasks",
                "Number of tasks currently holding a concurrency slot"
            );
            describe_gauge!(
                "scheduler_backlog_size",
                "Number of tasks waiting for a concurrency slot"
            );
            describe_histogram!(
                "scheduler_queue_wait_seconds",
                "Time tasks spent in the backlog before starting"
            );
        }

        let cache = ResponseCache::new(config.cache.clone());
        let retry = RetryController::new(config.retry.clone());

        Self {
            shared: Arc::new(Shared {
                config,
                cache,
                retry,
                executor,
                state: Mutex::new(State {
                    active: 0,
                    backlog: VecDeque::new(),
                }),
                next_task_id: AtomicU64::new(1),
            }),
        }
    }

    /// Submits a task.
    ///
    /// The cache lookup, invalidation and backlog append happen before this
    /// returns, in call order. The returned future resolves to the task's
    /// value or its terminal [`ClassifiedError`](tower_dispatch_core::ClassifiedError).
    pub fn submit<T>(&self, task: Task<T>) -> Submission<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let shared = &self.shared;
        let task_id = shared.next_task_id.fetch_add(1, Ordering::Relaxed);
        let Task {
            mut execute,
            cache_key,
            ttl,
            mutation,
        } = task;

        #[cfg(feature = "metrics")]
        counter!("scheduler_tasks_submitted_total", "scheduler" => shared.config.name.clone())
            .increment(1);

        if mutation {
            shared.clear_cache();
        }

        if let Some(key) = cache_key.as_deref() {
            let cached = shared
                .cache
                .get_as(key, |value| value.downcast::<T>().ok());

            if let Some(value) = cached {
                #[cfg(feature = "tracing")]
                debug!(scheduler = %shared.config.name, task_id, key, "Resolved from cache");

                shared.config.event_listeners.emit(&SchedulerEvent::CacheHit {
                    component_name: shared.config.name.clone(),
                    timestamp: Instant::now(),
                    task_id,
                    key: key.to_string(),
                });
                return Submission::ready(task_id, Ok(T::clone(&value)));
            }
        }

        let ttl = shared.resolve_ttl(ttl);
        let (tx, rx) = oneshot::channel();

        let job: Job<E> = Box::new(move |slot: SlotGuard<E>| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                let shared = Arc::clone(&slot.shared);
                if mutation {
                    shared.clear_cache();
                }
                // A clear while this task runs means its result may predate a mutation.
                let generation = shared.cache.generation();

                let result = shared.retry.run(|| execute()).await;

                if let (Ok(value), Some(key)) = (&result, cache_key) {
                    shared.cache.put_if_generation(
                        key,
                        Arc::new(value.clone()) as CachedValue,
                        ttl,
                        generation,
                    );
                }

                let error = result.as_ref().err().map(|err| err.kind());

                #[cfg(feature = "tracing")]
                debug!(scheduler = %shared.config.name, task_id, error = ?error, "Task finished");

                shared.config.event_listeners.emit(&SchedulerEvent::TaskFinished {
                    component_name: shared.config.name.clone(),
                    timestamp: Instant::now(),
                    task_id,
                    error,
                });

                drop(slot);
                let _ = tx.send(result);
            })
        });

        let backlog_len = {
            let mut state = shared.lock();
            state.backlog.push_back(Queued {
                task_id,
                enqueued_at: tokio::time::Instant::now(),
                job,
            });
            state.backlog.len()
        };

        #[cfg(feature = "tracing")]
        debug!(scheduler = %shared.config.name, task_id, backlog_len, "Task queued");

        shared.config.event_listeners.emit(&SchedulerEvent::TaskQueued {
            component_name: shared.config.name.clone(),
            timestamp: Instant::now(),
            task_id,
            backlog_len,
        });

        shared.drain();
        Submission::pending(task_id, rx)
    }

    /// Removes every cached result.
    ///
    /// Safe to call at any time, including while tasks are in flight.
    pub fn clear_cache(&self) {
        self.shared.clear_cache();
    }

    /// Number of tasks currently holding a slot.
    pub fn active_count(&self) -> usize {
        self.shared.lock().active
    }

    /// Number of tasks waiting for a slot.
    pub fn backlog_len(&self) -> usize {
        self.shared.lock().backlog.len()
    }

    /// Bound on tasks executing at the same time.
    pub fn max_concurrent_requests(&self) -> usize {
        self.shared.config.max_concurrent_requests
    }

    /// The response cache shared by all tasks.
    pub fn cache(&self) -> &ResponseCache<Arc<dyn Any + Send + Sync>> {
        &self.shared.cache
    }

    /// The scheduler's name, as used in events.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }
}

impl<E: Executor> Clone for Scheduler<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Executor> fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Scheduler")
            .field("name", &self.shared.config.name)
            .field("active", &state.active)
            .field("backlog", &state.backlog.len())
            .field(
                "max_concurrent_requests",
                &self.shared.config.max_concurrent_requests,
            )
            .finish()
    }
}

impl<E: Executor> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_ttl(&self, ttl: Ttl) -> Duration {
        match ttl {
            Ttl::Default => self.cache.default_ttl(),
            Ttl::Short => self.cache.short_ttl(),
            Ttl::Fixed(ttl) => ttl,
        }
    }

    fn clear_cache(&self) {
        self.cache.clear();
        self.config.event_listeners.emit(&SchedulerEvent::CacheCleared {
            component_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }

    /// Admits backlog entries while slots are free.
    fn drain(self: &Arc<Self>) {
        loop {
            let (queued, active_count, _backlog_len) = {
                let mut state = self.lock();
                if state.active >= self.config.max_concurrent_requests {
                    return;
                }
                let Some(queued) = state.backlog.pop_front() else {
                    return;
                };
                state.active += 1;
                (queued, state.active, state.backlog.len())
            };

            let queue_wait = queued.enqueued_at.elapsed();

            #[cfg(feature = "metrics")]
            {
                let name = self.config.name.clone();
                gauge!("scheduler_active_tasks", "scheduler" => name.clone())
                    .set(active_count as f64);
                gauge!("scheduler_backlog_size", "scheduler" => name.clone())
                    .set(_backlog_len as f64);
                histogram!("scheduler_queue_wait_seconds", "scheduler" => name)
                    .record(queue_wait.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(
                scheduler = %self.config.name,
                task_id = queued.task_id,
                active_count,
                queue_wait = ?queue_wait,
                "Task started"
            );

            self.config.event_listeners.emit(&SchedulerEvent::TaskStarted {
                component_name: self.config.name.clone(),
                timestamp: Instant::now(),
                task_id: queued.task_id,
                active_count,
                queue_wait,
            });

            let slot = SlotGuard {
                shared: Arc::clone(self),
            };
            self.executor.execute((queued.job)(slot));
        }
    }

    fn release(self: &Arc<Self>) {
        {
            let mut state = self.lock();
            state.active = state.active.saturating_sub(1);

            #[cfg(feature = "metrics")]
            gauge!("scheduler_active_tasks", "scheduler" => self.config.name.clone())
                .set(state.active as f64);
        }
        self.drain();
    }
}
