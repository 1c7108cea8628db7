//! Protected routes reject anonymous and badly authenticated callers before
//! touching the database.

use axum::http::{Method, StatusCode};
use davila_integration_tests::{json_request, request, send, test_app};
use serde_json::json;

const NOT_AUTHENTICATED: &str = "No se proporcionaron las credenciales de autenticación.";

#[tokio::test]
async fn test_customer_routes_require_authentication() {
    let app = test_app();
    for (method, uri) in [
        (Method::GET, "/cart"),
        (Method::DELETE, "/cart/clear"),
        (Method::GET, "/wishlist"),
        (Method::GET, "/orders"),
        (Method::GET, "/mis-pedidos"),
        (Method::GET, "/orders/1"),
        (Method::GET, "/usuarios/perfil"),
    ] {
        let resp = send(&app, request(method, uri, None)).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(resp.message("detail"), Some(NOT_AUTHENTICATED), "{uri}");
    }
}

#[tokio::test]
async fn test_admin_routes_require_authentication() {
    let app = test_app();
    for (method, uri) in [
        (Method::GET, "/usuarios"),
        (Method::GET, "/proveedores"),
        (Method::GET, "/admin/orders"),
        (Method::GET, "/admin/proveedor-stats"),
        (Method::DELETE, "/categorias/1/delete"),
        (Method::DELETE, "/productos/1/delete"),
    ] {
        let resp = send(&app, request(method, uri, None)).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_invalid_bearer_token_is_unauthorized() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/cart", Some("abc.def.ghi"))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.message("detail"),
        Some("El token es inválido o ha expirado.")
    );
}

#[tokio::test]
async fn test_checkout_body_checked_after_authentication() {
    let app = test_app();
    let body = json!({ "cart_id": 1 });
    let resp = send(
        &app,
        json_request(Method::POST, "/orders/create", &body, "10.0.2.1"),
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let app = test_app();
    let resp = send(&app, request(Method::GET, "/cart/add", None)).await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
}
