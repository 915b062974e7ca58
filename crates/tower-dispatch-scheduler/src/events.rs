use std::time::{Duration, Instant};
use tower_dispatch_core::{DispatchEvent, ErrorKind};

/// Events emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A task was resolved from the cache without consuming a slot.
    CacheHit {
        component_name: String,
        timestamp: Instant,
        task_id: u64,
        key: String,
    },
    /// A task missed the cache and joined the backlog.
    TaskQueued {
        component_name: String,
        timestamp: Instant,
        task_id: u64,
        backlog_len: usize,
    },
    /// A task took a slot and started executing.
    TaskStarted {
        component_name: String,
        timestamp: Instant,
        task_id: u64,
        active_count: usize,
        queue_wait: Duration,
    },
    /// A task reached a terminal state. `error` is `None` on success.
    TaskFinished {
        component_name: String,
        timestamp: Instant,
        task_id: u64,
        error: Option<ErrorKind>,
    },
    /// The cache was cleared by a mutation or an explicit call.
    CacheCleared {
        component_name: String,
        timestamp: Instant,
    },
}

impl DispatchEvent for SchedulerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SchedulerEvent::CacheHit { .. } => "cache_hit",
            SchedulerEvent::TaskQueued { .. } => "task_queued",
            SchedulerEvent::TaskStarted { .. } => "task_started",
            SchedulerEvent::TaskFinished { .. } => "task_finished",
            SchedulerEvent::CacheCleared { .. } => "cache_cleared",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            SchedulerEvent::CacheHit { timestamp, .. }
            | SchedulerEvent::TaskQueued { timestamp, .. }
            | SchedulerEvent::TaskStarted { timestamp, .. }
            | SchedulerEvent::TaskFinished { timestamp, .. }
            | SchedulerEvent::CacheCleared { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            SchedulerEvent::CacheHit { component_name, .. }
            | SchedulerEvent::TaskQueued { component_name, .. }
            | SchedulerEvent::TaskStarted { component_name, .. }
            | SchedulerEvent::TaskFinished { component_name, .. }
            | SchedulerEvent::CacheCleared { component_name, .. } => component_name,
        }
    }
}
