use super::failing_then_ok;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower_dispatch_core::{ClassifiedError, ErrorKind};
use tower_dispatch_retry::{FixedInterval, RetryConfig, RetryController};

fn controller(max_retries: usize) -> RetryController {
    RetryController::new(
        RetryConfig::builder()
            .max_retries(max_retries)
            .backoff(FixedInterval::new(Duration::from_millis(1)))
            .build(),
    )
}

#[tokio::test(start_paused = true)]
async fn retryable_kinds_are_retried() {
    for error in [
        ClassifiedError::rate_limited(None),
        ClassifiedError::server_error(503),
        ClassifiedError::network_error("dns failure"),
    ] {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = controller(3)
            .run(failing_then_ok(vec![error], Arc::clone(&calls)))
            .await;
        assert_eq!(result.unwrap(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn non_retryable_kinds_fail_fast() {
    for error in [
        ClassifiedError::client_error(400),
        ClassifiedError::client_error(404),
        ClassifiedError::unauthenticated(),
        ClassifiedError::aborted("cancelled"),
    ] {
        let kind = error.kind();
        let calls = Arc::new(AtomicUsize::new(0));
        let result = controller(3)
            .run(failing_then_ok(vec![error], Arc::clone(&calls)))
            .await;

        assert_eq!(result.unwrap_err().kind(), kind);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn last_error_is_returned_unchanged() {
    let calls = Arc::new(AtomicUsize::new(0));
    let errors = vec![
        ClassifiedError::server_error(500),
        ClassifiedError::network_error("reset"),
        ClassifiedError::server_error(502),
        ClassifiedError::server_error(504),
    ];

    let err = controller(3)
        .run(failing_then_ok(errors, Arc::clone(&calls)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServerError);
    assert_eq!(err.status(), Some(504));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_after_retries_stops_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let errors = vec![
        ClassifiedError::server_error(500),
        ClassifiedError::client_error(409),
        ClassifiedError::server_error(500),
    ];

    let err = controller(3)
        .run(failing_then_ok(errors, Arc::clone(&calls)))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_retries_attempts_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let err = controller(0)
        .run(failing_then_ok(
            vec![ClassifiedError::server_error(500)],
            Arc::clone(&calls),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServerError);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn success_on_final_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let result = controller(3)
        .run(failing_then_ok(
            vec![ClassifiedError::server_error(500); 3],
            Arc::clone(&calls),
        ))
        .await;

    assert_eq!(result.unwrap(), 4);
}

#[tokio::test(start_paused = true)]
async fn controller_is_reusable_across_runs() {
    let controller = controller(1);

    for _ in 0..3 {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = controller
            .run(failing_then_ok(
                vec![ClassifiedError::network_error("flaky")],
                Arc::clone(&calls),
            ))
            .await;
        assert_eq!(result.unwrap(), 2);
    }
}
