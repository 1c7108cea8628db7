//! HTTP plumbing: health checks, path normalization, CORS and headers.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use davila_integration_tests::{FRONTEND_ORIGIN, request, send, test_app};

#[tokio::test]
async fn test_health_is_ok() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/health", None)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, "ok");
}

#[tokio::test]
async fn test_trailing_slash_is_trimmed() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/health/", None)).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/health/ready", None)).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/health", None)).await;
    assert_eq!(resp.headers["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers["x-frame-options"], "DENY");
    assert_eq!(resp.headers["cache-control"], "no-store");
    assert!(resp.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let app = test_app();
    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "pedido-1234")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.headers["x-request-id"], "pedido-1234");
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_with_credentials() {
    let app = test_app();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/cart/add")
        .header(header::ORIGIN, FRONTEND_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(
        resp.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        FRONTEND_ORIGIN
    );
    assert_eq!(resp.headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let app = test_app();
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert!(!resp.headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/no-existe", None)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
