//! Interceptor metrics regression tests

use super::helpers::*;
use http::{Request, Response};
use serial_test::serial;
use tower::{Layer, ServiceExt};
use tower_dispatch_interceptor::{InterceptLayer, InterceptorConfig};

#[tokio::test]
#[serial]
async fn interceptor_metrics_exist() {
    init_recorder();

    let layer = InterceptLayer::new(
        InterceptorConfig::builder()
            .name("test_interceptor")
            .build(),
    );

    for status in [503u16, 404, 429] {
        let transport = tower::service_fn(move |_req: Request<()>| async move {
            let mut response = Response::new(());
            *response.status_mut() = http::StatusCode::from_u16(status).unwrap();
            Ok::<_, std::io::Error>(response)
        });
        let _ = layer.layer(transport).oneshot(Request::new(())).await;
    }

    assert_counter_exists("interceptor_errors_total");
    assert_metric_has_label("interceptor_errors_total", "interceptor", "test_interceptor");
    assert_metric_has_label("interceptor_errors_total", "kind", "server_error");
    assert_metric_has_label("interceptor_errors_total", "kind", "client_error");
    assert_metric_has_label("interceptor_errors_total", "kind", "rate_limited");
}
