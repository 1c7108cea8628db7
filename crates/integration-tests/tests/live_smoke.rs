//! Smoke tests against a running API with a migrated database.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied (`davila-cli migrate`)
//! - The API server running (`cargo run -p davila-api`)
//!
//! Run with: `cargo test -p davila-integration-tests -- --ignored`

use davila_integration_tests::live_base_url;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_live_readiness() {
    let resp = client()
        .get(format!("{}/health/ready", live_base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_live_public_catalog() {
    let client = client();
    let base_url = live_base_url();

    for path in ["/productos", "/productos/nuevos", "/categorias", "/marcas"] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Failed to reach server");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let body: Value = resp.json().await.expect("Invalid JSON");
        assert!(body.is_array(), "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_live_anonymous_listing_hides_wholesale_price() {
    let resp = client()
        .get(format!("{}/productos", live_base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    let products: Vec<Value> = resp.json().await.expect("Invalid JSON");
    for product in products {
        assert!(product["precio_mayoreo"].is_null());
    }
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_live_login_with_unknown_user() {
    let resp = client()
        .post(format!("{}/auth/login", live_base_url()))
        .json(&json!({ "email": "nadie@davila.pe", "password": "Clave-123" }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
