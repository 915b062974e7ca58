use super::{MockTransport, Outcome};
use http::header::AUTHORIZATION;
use http::Request;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tower::{Layer, ServiceExt};
use tower_dispatch_core::ErrorKind;
use tower_dispatch_interceptor::{
    CredentialStore, InMemoryCredentialStore, InterceptLayer, InterceptorConfig, TransportError,
};
use tower_dispatch_retry::{RetryConfig, RetryController};

#[tokio::test(start_paused = true)]
async fn classified_failures_drive_the_retry_schedule() {
    let transport = MockTransport::scripted([
        Outcome::Status(503, vec![]),
        Outcome::Status(429, vec![("retry-after", "3")]),
        Outcome::Fail(TransportError::connect("reset")),
    ]);
    let service = InterceptLayer::new(InterceptorConfig::default()).layer(transport.clone());
    let controller = RetryController::new(RetryConfig::default());

    let start = Instant::now();
    let response = controller
        .run(|| service.clone().oneshot(Request::new(())))
        .await
        .unwrap();

    assert_eq!(response.into_body(), "ok");
    assert_eq!(transport.calls(), 4);
    // 1s backoff, 3s Retry-After, 4s backoff.
    assert_eq!(start.elapsed(), Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn every_attempt_gets_its_own_correlation_id() {
    let transport = MockTransport::scripted([
        Outcome::Status(500, vec![]),
        Outcome::Status(500, vec![]),
    ]);
    let service = InterceptLayer::new(InterceptorConfig::default()).layer(transport.clone());

    RetryController::new(RetryConfig::default())
        .run(|| service.clone().oneshot(Request::new(())))
        .await
        .unwrap();

    let ids: Vec<_> = transport
        .seen()
        .iter()
        .map(|headers| headers["x-correlation-id"].clone())
        .collect();
    assert_eq!(ids.len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_is_not_retried() {
    let credentials = Arc::new(InMemoryCredentialStore::with_token("expired"));
    let transport = MockTransport::status(401);
    let service = InterceptLayer::new(
        InterceptorConfig::builder()
            .credentials(credentials.clone())
            .build(),
    )
    .layer(transport.clone());

    let start = Instant::now();
    let err = RetryController::new(RetryConfig::default())
        .run(|| service.clone().oneshot(Request::new(())))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert_eq!(transport.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(credentials.token().is_none());
}

#[tokio::test(start_paused = true)]
async fn timeouts_are_retried_like_network_errors() {
    let transport = MockTransport::scripted([Outcome::Hang, Outcome::Hang]);
    let service = InterceptLayer::new(
        InterceptorConfig::builder()
            .request_timeout(Duration::from_secs(5))
            .build(),
    )
    .layer(transport.clone());

    let start = Instant::now();
    RetryController::new(RetryConfig::default())
        .run(|| service.clone().oneshot(Request::new(())))
        .await
        .unwrap();

    assert_eq!(transport.calls(), 3);
    // Two 5s timeouts plus 1s and 2s of backoff.
    assert_eq!(start.elapsed(), Duration::from_secs(13));
    assert!(transport.seen().iter().all(|h| h.get(AUTHORIZATION).is_none()));
}
