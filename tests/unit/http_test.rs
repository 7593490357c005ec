use super::common::*;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mediaflow::mediaflow::server::{CONFIRMATION, router};
use tower::ServiceExt;

async fn get(trigger: Arc<IngestionTrigger>, uri: &str) -> (StatusCode, String) {
    let response = router(trigger)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new(test_config());
    let (status, body) = get(harness.service.trigger(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_media_returns_confirmation() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    let (status, body) = get(harness.service.trigger(), "/media").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, CONFIRMATION);
    assert_eq!(harness.executor.row_count(), 8);

    group.shutdown().await;
}

#[tokio::test]
async fn test_media_confirms_even_when_wait_expires() {
    init_logger();
    let harness = Harness::new(test_config());
    let trigger = harness
        .trigger_for(IngestInput::Text(media_rows(2)))
        .with_timeout(Duration::from_millis(50));

    let (status, body) = get(Arc::new(trigger), "/media").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, CONFIRMATION);
}

#[tokio::test]
async fn test_media_reports_unavailable_store() {
    init_logger();
    let mut config = test_config();
    config.cassandra.ca_cert_path = fixture("missing_ca.pem");
    let harness = Harness::new(config);

    let (status, _) = get(harness.service.trigger(), "/media").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(harness.bus.published_count(&harness.topic()), 0);
}

#[tokio::test]
async fn test_media_reports_malformed_input() {
    init_logger();
    let harness = Harness::new(test_config());
    let trigger = harness.trigger_for(IngestInput::Text("only$three$columns\n".to_string()));

    let (status, body) = get(Arc::new(trigger), "/media").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("line 1"), "{}", body);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let harness = Harness::new(test_config());
    let (status, _) = get(harness.service.trigger(), "/videos").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
