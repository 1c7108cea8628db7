//! Account endpoints: validation that happens before any database access,
//! token checks and the per-IP limiter.

use axum::http::{Method, StatusCode, header};
use davila_integration_tests::{json_request, request, send, test_app};
use serde_json::json;

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = test_app();
    let body = json!({
        "email": "cliente@davila.pe",
        "password": "Moto-Repuesto1",
        "password2": "Moto-Repuesto2",
    });
    let resp = send(&app, json_request(Method::POST, "/register", &body, "10.0.0.1")).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.field_error("password"),
        Some("Las contraseñas no coinciden.")
    );
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = test_app();
    let body = json!({
        "email": "no-es-un-correo",
        "password": "Moto-Repuesto1",
        "password2": "Moto-Repuesto1",
    });
    let resp = send(&app, json_request(Method::POST, "/register", &body, "10.0.0.2")).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.field_error("email").is_some());
}

#[tokio::test]
async fn test_register_requires_fields() {
    let app = test_app();
    let resp = send(
        &app,
        json_request(Method::POST, "/register", &json!({}), "10.0.0.3"),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    for field in ["email", "password", "password2"] {
        assert_eq!(resp.field_error(field), Some("Este campo es requerido."));
    }
}

#[tokio::test]
async fn test_malformed_json_is_rejected_with_detail() {
    let app = test_app();
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "10.0.0.4")
        .body(axum::body::Body::from("{\"email\":"))
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.message("detail").unwrap().starts_with("JSON inválido"));
}

#[tokio::test]
async fn test_refresh_without_token_is_a_field_error() {
    let app = test_app();
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/token/refresh")
        .header("x-forwarded-for", "10.0.0.5")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.field_error("refresh"), Some("Este campo es requerido."));
}

#[tokio::test]
async fn test_verify_token_rejects_garbage() {
    let app = test_app();
    let body = json!({ "token": "no.es.jwt" });
    let resp = send(
        &app,
        json_request(Method::POST, "/api/token/verify", &body, "10.0.0.6"),
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.message("detail"),
        Some("El token es inválido o ha expirado.")
    );
}

#[tokio::test]
async fn test_logout_clears_both_cookies() {
    let app = test_app();
    let resp = send(
        &app,
        json_request(Method::POST, "/auth/logout", &json!({}), "10.0.0.7"),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    let cookies: Vec<_> = resp
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited_per_ip() {
    let app = test_app();
    let body = json!({ "token": "x" });

    for _ in 0..5 {
        let resp = send(
            &app,
            json_request(Method::POST, "/api/token/verify", &body, "10.0.1.1"),
        )
        .await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    let limited = send(
        &app,
        json_request(Method::POST, "/api/token/verify", &body, "10.0.1.1"),
    )
    .await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.message("detail").is_some());

    // Another client still has its burst
    let other = send(
        &app,
        json_request(Method::POST, "/api/token/verify", &body, "10.0.1.2"),
    )
    .await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_info_requires_token() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/api/user-info", None)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}
