use super::{create_student, init_tracing, list_students, Backend};
use http::Request;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{advance, Instant};
use tower_dispatch::prelude::*;

fn dispatcher(backend: &Backend) -> Dispatcher<Backend> {
    Dispatcher::new(
        backend.clone(),
        SchedulerConfig::default(),
        InterceptorConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn create_then_list_returns_fresh_data() {
    init_tracing();
    let backend = Backend::with_students(&["ada"]);
    let dispatcher = dispatcher(&backend);

    let before = dispatcher
        .fetch_default(list_students, "students:list")
        .await
        .unwrap();
    assert_eq!(before, "ada");

    dispatcher.mutate(create_student("grace")).await.unwrap();

    let after = dispatcher
        .fetch_default(list_students, "students:list")
        .await
        .unwrap();
    assert_eq!(after, "ada,grace");
    assert_eq!(backend.requests(), 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_reads_hit_the_cache_until_expiry() {
    let backend = Backend::with_students(&["ada"]);
    let dispatcher = dispatcher(&backend);

    for _ in 0..5 {
        dispatcher
            .fetch(list_students, "students:list", Duration::from_secs(30))
            .await
            .unwrap();
    }
    assert_eq!(backend.requests(), 1);

    advance(Duration::from_secs(30)).await;
    dispatcher
        .fetch(list_students, "students:list", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(backend.requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn live_reads_expire_after_a_minute() {
    let backend = Backend::with_students(&["ada"]);
    let dispatcher = dispatcher(&backend);

    dispatcher.fetch_live(list_students, "roster").await.unwrap();
    advance(Duration::from_secs(59)).await;
    dispatcher.fetch_live(list_students, "roster").await.unwrap();
    assert_eq!(backend.requests(), 1);

    advance(Duration::from_secs(1)).await;
    dispatcher.fetch_live(list_students, "roster").await.unwrap();
    assert_eq!(backend.requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_recover_with_backoff() {
    let backend = Backend::with_students(&["ada"]);
    backend.fail_next(&[503, 502]);
    let dispatcher = dispatcher(&backend);

    let start = Instant::now();
    let body = dispatcher
        .fetch_default(list_students, "students:list")
        .await
        .unwrap();

    assert_eq!(body, "ada");
    assert_eq!(backend.requests(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_surfaces_after_four_attempts() {
    let backend = Backend::default();
    backend.fail_next(&[500, 500, 500, 500]);
    let dispatcher = dispatcher(&backend);

    let err = dispatcher
        .fetch_default(list_students, "students:list")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServerError);
    assert_eq!(
        err.user_message(),
        "The server encountered an error. Please try again later."
    );
    assert_eq!(backend.requests(), 4);
    assert!(dispatcher.scheduler().cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn client_errors_fail_fast() {
    let backend = Backend::default();
    let dispatcher = dispatcher(&backend);

    let err = dispatcher
        .fetch_default(
            || Request::get("/unknown").body(String::new()).unwrap(),
            "unknown",
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ClientError);
    assert_eq!(err.status(), Some(404));
    assert_eq!(backend.requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_expiry_clears_credentials_and_redirects() {
    init_tracing();
    let backend = Backend::with_students(&["ada"]);
    backend.fail_next(&[401]);
    let credentials = Arc::new(InMemoryCredentialStore::with_token("expired"));
    let redirects = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&redirects);

    let dispatcher = Dispatcher::new(
        backend.clone(),
        SchedulerConfig::default(),
        InterceptorConfig::builder()
            .credentials(credentials.clone())
            .navigator(Arc::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }))
            .build(),
    );

    let err = dispatcher
        .fetch_default(list_students, "students:list")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert_eq!(redirects.load(Ordering::SeqCst), 1);
    assert!(credentials.token().is_none());

    credentials.set_token("renewed".to_string());
    dispatcher
        .fetch_default(list_students, "students:list")
        .await
        .unwrap();

    assert_eq!(
        backend.tokens(),
        vec![
            Some("Bearer expired".to_string()),
            Some("Bearer renewed".to_string())
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded_across_mixed_requests() {
    let backend = Backend::with_students(&["ada"]);
    let dispatcher = Dispatcher::new(
        backend.clone(),
        SchedulerConfig::builder().max_concurrent_requests(2).build(),
        InterceptorConfig::default(),
    );

    let reads: Vec<_> = (0..6)
        .map(|i| dispatcher.fetch_default(list_students, format!("page:{i}")))
        .collect();
    let scheduler = dispatcher.scheduler();
    assert!(scheduler.active_count() <= 2);
    assert_eq!(scheduler.active_count() + scheduler.backlog_len(), 6);

    for read in reads {
        assert_eq!(read.await.unwrap(), "ada");
    }
    assert_eq!(scheduler.cache().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn clear_cache_forces_network_reads() {
    let backend = Backend::with_students(&["ada"]);
    let dispatcher = dispatcher(&backend);

    dispatcher.fetch_default(list_students, "k").await.unwrap();
    dispatcher.clear_cache();
    dispatcher.fetch_default(list_students, "k").await.unwrap();

    assert_eq!(backend.requests(), 2);
}
