use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tower_dispatch_core::{ClassifiedError, ErrorKind};
use tower_dispatch_scheduler::{Scheduler, SchedulerConfig, Task};

/// Records the instant of every attempt relative to `start`.
fn attempt_log() -> (Arc<Mutex<Vec<Duration>>>, Instant) {
    (Arc::new(Mutex::new(Vec::new())), Instant::now())
}

#[tokio::test(start_paused = true)]
async fn ten_tasks_with_default_bound() {
    let scheduler = Scheduler::new(SchedulerConfig::default());

    let submissions: Vec<_> = (0..10)
        .map(|i| {
            scheduler.submit(Task::uncached(move || async move {
                sleep(Duration::from_millis(100)).await;
                Ok::<_, ClassifiedError>(i)
            }))
        })
        .collect();

    assert_eq!(scheduler.active_count(), 5);
    assert_eq!(scheduler.backlog_len(), 5);

    let start = Instant::now();
    let mut results = Vec::new();
    for submission in submissions {
        results.push(submission.await.unwrap());
    }

    assert_eq!(results, (0..10).collect::<Vec<_>>());
    // Two waves of five.
    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn server_errors_back_off_exponentially_then_surface() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let (log, start) = attempt_log();
    let l = Arc::clone(&log);

    let err = scheduler
        .submit(Task::uncached(move || {
            l.lock().unwrap().push(start.elapsed());
            async { Err::<(), _>(ClassifiedError::server_error(500)) }
        }))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServerError);
    assert_eq!(err.status(), Some(500));
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(7),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn rate_limit_waits_for_retry_after() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let (log, start) = attempt_log();
    let l = Arc::clone(&log);

    let value = scheduler
        .submit(Task::uncached(move || {
            let mut log = l.lock().unwrap();
            log.push(start.elapsed());
            let first = log.len() == 1;
            async move {
                if first {
                    Err(ClassifiedError::rate_limited(Some(Duration::from_secs(2))))
                } else {
                    Ok("accepted")
                }
            }
        }))
        .await
        .unwrap();

    assert_eq!(value, "accepted");
    assert_eq!(
        *log.lock().unwrap(),
        vec![Duration::ZERO, Duration::from_secs(2)]
    );
}

#[tokio::test(start_paused = true)]
async fn non_retryable_kinds_are_attempted_once() {
    let scheduler = Scheduler::new(SchedulerConfig::default());

    for error in [
        ClassifiedError::client_error(404),
        ClassifiedError::client_error(422),
        ClassifiedError::unauthenticated(),
    ] {
        let kind = error.kind();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let error = Arc::new(Mutex::new(Some(error)));

        let start = Instant::now();
        let result = scheduler
            .submit(Task::uncached(move || {
                c.fetch_add(1, Ordering::SeqCst);
                let error = error.lock().unwrap().take();
                async move { Err::<(), _>(error.unwrap_or_else(ClassifiedError::unauthenticated)) }
            }))
            .await;

        assert_eq!(result.unwrap_err().kind(), kind);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

#[tokio::test(start_paused = true)]
async fn network_errors_recover_within_budget() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    let start = Instant::now();
    let value = scheduler
        .submit(Task::uncached(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(ClassifiedError::network_error("connection reset"))
                } else {
                    Ok(n)
                }
            }
        }))
        .await
        .unwrap();

    assert_eq!(value, 3);
    assert_eq!(start.elapsed(), Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn create_then_list_sees_fresh_data() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let backend = Arc::new(Mutex::new(vec!["ada".to_string()]));
    let list_calls = Arc::new(AtomicUsize::new(0));

    let list = |backend: &Arc<Mutex<Vec<String>>>, calls: &Arc<AtomicUsize>| {
        let backend = Arc::clone(backend);
        let calls = Arc::clone(calls);
        Task::read_default("students:list", move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let snapshot = backend.lock().unwrap().clone();
            async move { Ok::<_, ClassifiedError>(snapshot) }
        })
    };

    let before = scheduler.submit(list(&backend, &list_calls)).await.unwrap();
    assert_eq!(before, vec!["ada"]);

    let cached = scheduler.submit(list(&backend, &list_calls)).await.unwrap();
    assert_eq!(cached, before);
    assert_eq!(list_calls.load(Ordering::SeqCst), 1);

    let b = Arc::clone(&backend);
    scheduler
        .submit(Task::mutation(move || {
            b.lock().unwrap().push("grace".to_string());
            async { Ok::<_, ClassifiedError>(()) }
        }))
        .await
        .unwrap();

    let after = scheduler.submit(list(&backend, &list_calls)).await.unwrap();
    assert_eq!(after, vec!["ada", "grace"]);
    assert_eq!(list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn retrying_task_holds_its_slot_while_others_queue() {
    let scheduler = Scheduler::new(
        SchedulerConfig::builder()
            .max_concurrent_requests(1)
            .build(),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    let start = Instant::now();
    let flaky = scheduler.submit(Task::uncached(move || {
        let n = c.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                Err(ClassifiedError::server_error(502))
            } else {
                Ok(n)
            }
        }
    }));
    let waiting = scheduler.submit(Task::uncached(move || async move {
        Ok::<_, ClassifiedError>(start.elapsed())
    }));

    assert_eq!(flaky.await.unwrap(), 1);
    // The queued task only starts after the 1s backoff and the retry.
    assert_eq!(waiting.await.unwrap(), Duration::from_secs(1));
}
