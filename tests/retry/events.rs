use super::failing_then_ok;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_dispatch_core::{ClassifiedError, ErrorKind};
use tower_dispatch_retry::{RetryConfig, RetryController};

#[tokio::test(start_paused = true)]
async fn on_retry_reports_attempt_number_and_delay() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);

    let controller = RetryController::new(
        RetryConfig::builder()
            .on_retry(move |attempt, delay| s.lock().unwrap().push((attempt, delay)))
            .build(),
    );

    let calls = Arc::new(AtomicUsize::new(0));
    controller
        .run(failing_then_ok(
            vec![
                ClassifiedError::server_error(500),
                ClassifiedError::rate_limited(Some(Duration::from_secs(3))),
                ClassifiedError::network_error("reset"),
            ],
            calls,
        ))
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (1, Duration::from_secs(1)),
            (2, Duration::from_secs(3)),
            (3, Duration::from_secs(4)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn on_exhausted_reports_total_attempts() {
    let exhausted = Arc::new(Mutex::new(None));
    let e = Arc::clone(&exhausted);

    let controller = RetryController::new(
        RetryConfig::builder()
            .max_retries(2)
            .on_exhausted(move |attempts, kind| *e.lock().unwrap() = Some((attempts, kind)))
            .build(),
    );

    let _ = controller
        .run(|| async { Err::<(), _>(ClassifiedError::server_error(503)) })
        .await;

    assert_eq!(*exhausted.lock().unwrap(), Some((3, ErrorKind::ServerError)));
}

#[tokio::test(start_paused = true)]
async fn on_not_retryable_fires_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let (c, k) = (Arc::clone(&count), Arc::clone(&kinds));

    let controller = RetryController::new(
        RetryConfig::builder()
            .on_not_retryable(move |kind| {
                c.fetch_add(1, Ordering::SeqCst);
                k.lock().unwrap().push(kind);
            })
            .build(),
    );

    let _ = controller
        .run(|| async { Err::<(), _>(ClassifiedError::unauthenticated()) })
        .await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(*kinds.lock().unwrap(), vec![ErrorKind::Unauthenticated]);
}

#[tokio::test(start_paused = true)]
async fn success_without_retry_emits_only_success() {
    let retries = Arc::new(AtomicUsize::new(0));
    let successes = Arc::new(Mutex::new(Vec::new()));
    let (r, s) = (Arc::clone(&retries), Arc::clone(&successes));

    let controller = RetryController::new(
        RetryConfig::builder()
            .name("students")
            .on_retry(move |_, _| {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .on_success(move |attempts| s.lock().unwrap().push(attempts))
            .build(),
    );

    controller
        .run(|| async { Ok::<_, ClassifiedError>(()) })
        .await
        .unwrap();

    assert_eq!(retries.load(Ordering::SeqCst), 0);
    assert_eq!(*successes.lock().unwrap(), vec![1]);
}
