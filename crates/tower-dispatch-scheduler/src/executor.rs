//! Where admitted tasks run.
//!
//! Admission hands each task to an [`Executor`] as soon as a slot frees up, so
//! the backlog drains without anyone polling a [`Submission`](crate::Submission).
//! The task owns its slot and its result channel; the executor only has to
//! drive it to completion.

use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// Runs admitted tasks in the background.
///
/// A task that is dropped unfinished (runtime shutdown, panic) releases its
/// slot and resolves its submission as `Aborted`.
pub trait Executor: Clone + Send + Sync + 'static {
    /// Starts `task`. Must not wait for it to finish.
    fn execute(&self, task: BoxFuture<'static, ()>);
}

impl Executor for Handle {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.spawn(task);
    }
}

/// Spawns onto the tokio runtime the scheduler was built in.
#[derive(Clone, Debug)]
pub struct CurrentRuntime {
    handle: Handle,
}

impl CurrentRuntime {
    /// # Panics
    ///
    /// Panics outside a tokio runtime. Use [`try_new`](Self::try_new) to
    /// check first.
    pub fn new() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// `None` outside a tokio runtime.
    pub fn try_new() -> Option<Self> {
        Handle::try_current().ok().map(|handle| Self { handle })
    }
}

impl Default for CurrentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for CurrentRuntime {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.handle.execute(task);
    }
}
