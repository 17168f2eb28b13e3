use axum::{
    body::Body,
    extract::Extension,
    http::{Request, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use modkit::http::request_id::XRequestId;
use modkit::{internal_error, with_standard_layers, HttpOptions, ProblemResponse};
use serde_json::json;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

fn test_app(opts: HttpOptions) -> Router {
    let routes = Router::new()
        .route("/test", get(success_handler))
        .route("/error", get(error_handler))
        .route("/slow", get(slow_handler))
        .route("/health", get(modkit::health_check));
    with_standard_layers(routes, &opts)
}

async fn success_handler(
    Extension(XRequestId(request_id)): Extension<XRequestId>,
) -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "request_id": request_id}))
}

async fn error_handler(
    Extension(XRequestId(request_id)): Extension<XRequestId>,
) -> ProblemResponse {
    let mut p = internal_error("Test error");
    p.0 = p.0.with_request_id(request_id);
    p
}

async fn slow_handler() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

fn header(resp: &axum::response::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[tokio::test]
async fn generates_request_id_when_missing() {
    let response = test_app(HttpOptions::default())
        .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rid = header(&response, "x-request-id").expect("x-request-id should be generated");
    assert!(!rid.is_empty());

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["request_id"], rid);
}

#[tokio::test]
async fn preserves_incoming_request_id() {
    let response = test_app(HttpOptions::default())
        .oneshot(
            Request::builder()
                .uri("/test")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-request-id").as_deref(), Some("abc-123"));
}

#[tokio::test]
async fn problem_responses_keep_request_id() {
    let response = test_app(HttpOptions::default())
        .oneshot(
            Request::builder()
                .uri("/error")
                .header("x-request-id", "error-test-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        header(&response, "content-type").as_deref(),
        Some("application/problem+json")
    );
    assert_eq!(
        header(&response, "x-request-id").as_deref(),
        Some("error-test-123")
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], 500);
    assert_eq!(json["detail"], "Test error");
    assert_eq!(json["request_id"], "error-test-123");
}

#[tokio::test]
async fn slow_handlers_time_out() {
    let opts = HttpOptions {
        request_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let response = test_app(opts)
        .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn health_reports_healthy() {
    let response = test_app(HttpOptions::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}
