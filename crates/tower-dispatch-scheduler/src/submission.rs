use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tower_dispatch_core::ClassifiedError;

/// The eventual outcome of a submitted task.
///
/// The task runs whether or not this future is polled. Dropping it does not
/// cancel the task; the result is discarded.
#[must_use = "the task runs regardless, but its outcome is lost unless awaited"]
pub struct Submission<T> {
    task_id: u64,
    state: State<T>,
}

enum State<T> {
    Ready(Option<Result<T, ClassifiedError>>),
    Pending(oneshot::Receiver<Result<T, ClassifiedError>>),
}

impl<T> Submission<T> {
    pub(crate) fn ready(task_id: u64, result: Result<T, ClassifiedError>) -> Self {
        Self {
            task_id,
            state: State::Ready(Some(result)),
        }
    }

    pub(crate) fn pending(
        task_id: u64,
        receiver: oneshot::Receiver<Result<T, ClassifiedError>>,
    ) -> Self {
        Self {
            task_id,
            state: State::Pending(receiver),
        }
    }

    /// Identifier assigned at submission, as seen in scheduler events.
    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    /// Returns `true` if the outcome was available at submission (cache hit).
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(Some(_)))
    }
}

// `T` is never pinned in place.
impl<T> Unpin for Submission<T> {}

impl<T> Future for Submission<T> {
    type Output = Result<T, ClassifiedError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Ready(result) => Poll::Ready(result.take().unwrap_or_else(|| {
                Err(ClassifiedError::aborted("submission polled after completion"))
            })),
            State::Pending(receiver) => Pin::new(receiver).poll(cx).map(|outcome| {
                outcome.unwrap_or_else(|_| {
                    Err(ClassifiedError::aborted(
                        "task terminated before producing a result",
                    ))
                })
            }),
        }
    }
}
