//! Order, stock and lockout flows against a running API and its database.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied (`davila-cli migrate`)
//! - The API server running (`cargo run -p davila-api`) without SMTP, so
//!   verification codes are only stored, never mailed
//! - `DAVILA_DATABASE_URL` pointing at the server's database
//!
//! Each test sends its own `x-forwarded-for` address so the per-IP auth
//! limiter budgets do not collide.
//!
//! Run with: `cargo test -p davila-integration-tests -- --ignored`

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use davila_api::db::products::ProductRepository;
use davila_api::db::suppliers::{SupplierFields, SupplierRepository};
use davila_api::db::users::{NewUser, UserRepository};
use davila_api::models::product::NewProduct;
use davila_api::services::auth::hash_password;
use davila_core::{Email, ProductId, SupplierKind};
use davila_integration_tests::{live_base_url, live_pool};

const PASSWORD: &str = "Repuesto-2025";

/// Short random tag for unique codes and emails.
fn tag() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

/// Client whose requests appear to come from `ip`.
fn client_from(ip: &str) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(ip).expect("Invalid IP header"),
    );
    Client::builder()
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Verified account created straight in the database.
async fn seed_user(pool: &PgPool, email: &str, is_staff: bool) {
    let email = Email::parse(email).expect("Invalid email");
    let hash = hash_password(PASSWORD).expect("Failed to hash password");
    UserRepository::new(pool)
        .create(&NewUser {
            email: &email,
            password_hash: &hash,
            nombre: Some("Prueba"),
            apellidos: None,
            is_staff,
            is_verified: true,
        })
        .await
        .expect("Failed to create user");
}

/// A supplier and one product with `stock` units.
async fn seed_product(pool: &PgPool, stock: i32) -> ProductId {
    let tag = tag();
    let supplier = SupplierRepository::new(pool)
        .create(&SupplierFields {
            nombre_empresa: format!("Repuestos {tag}"),
            nombre_contacto: "Rosa Huaman".to_string(),
            telefono: "+51987654321".to_string(),
            correo: Email::parse(&format!("ventas-{tag}@proveedor.pe")).expect("Invalid email"),
            direccion: "Av. Grau 123, Lima".to_string(),
            ruc_documento: format!("RUC-{tag}"),
            tipo_proveedor: SupplierKind::Nacional,
            marcas: "Honda".to_string(),
            categorias: "Frenos".to_string(),
        })
        .await
        .expect("Failed to create supplier");

    ProductRepository::new(pool)
        .create(
            &NewProduct {
                codigo: format!("PF-{tag}"),
                nombre_producto: format!("Pastillas {tag}"),
                descripcion: None,
                proveedor_id: supplier.id,
                marca: "Honda".to_string(),
                categoria: "Frenos".to_string(),
                procedencia: Some("Japon".to_string()),
                precio_unitario: Decimal::new(4590, 2),
                precio_mayoreo: Some(Decimal::new(3800, 2)),
                stock,
                es_nuevo: false,
                fecha_novedad: None,
                es_destacado: false,
            },
            None,
        )
        .await
        .expect("Failed to create product")
        .id
}

async fn stock_of(pool: &PgPool, id: ProductId) -> i32 {
    ProductRepository::new(pool)
        .get(id)
        .await
        .expect("Failed to load product")
        .expect("Product disappeared")
        .stock
}

async fn login(client: &Client, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/auth/login", live_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to reach server")
}

async fn access_token(client: &Client, email: &str) -> String {
    let resp = login(client, email, PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid JSON");
    body["access"]
        .as_str()
        .expect("Missing access token")
        .to_string()
}

async fn place_order(client: &Client, token: &str, cart_id: &Value) -> reqwest::Response {
    client
        .post(format!("{}/orders/create", live_base_url()))
        .bearer_auth(token)
        .json(&json!({
            "cart_id": cart_id,
            "dni": "45879632",
            "phone": "987654321",
            "address": "Jr. Junin 456",
            "city": "Arequipa",
            "state": "Arequipa",
        }))
        .send()
        .await
        .expect("Failed to reach server")
}

async fn set_status(client: &Client, token: &str, order_id: &Value, status: &str) {
    let resp = client
        .patch(format!("{}/admin/orders/{order_id}/update", live_base_url()))
        .bearer_auth(token)
        .json(&json!({ "status": status }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK, "status change to {status}");
}

// ============================================================================
// Registration, checkout and stock
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_live_checkout_moves_stock_with_status() {
    let pool = live_pool().await;
    let base_url = live_base_url();
    let customer = client_from("198.51.100.21");
    let admin = client_from("198.51.100.22");

    let product_id = seed_product(&pool, 10).await;
    let admin_email = format!("admin-{}@davila.pe", tag());
    seed_user(&pool, &admin_email, true).await;

    // Register and confirm the emailed code
    let email = format!("cliente-{}@davila.pe", tag());
    let resp = customer
        .post(format!("{base_url}/register"))
        .json(&json!({
            "email": email,
            "nombre": "Carlos",
            "password": PASSWORD,
            "password2": PASSWORD,
        }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let code: String = sqlx::query_scalar(
        "SELECT verification_code FROM tienda.pending_user WHERE email = $1",
    )
    .bind(&email)
    .fetch_one(&pool)
    .await
    .expect("Pending registration not stored");

    let resp = customer
        .post(format!("{base_url}/verify"))
        .json(&json!({ "email": email, "code": code }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);

    let token = access_token(&customer, &email).await;
    let admin_token = access_token(&admin, &admin_email).await;

    // Add to the cart and check out
    let resp = customer
        .post(format!("{base_url}/cart/add"))
        .bearer_auth(&token)
        .json(&json!({ "producto_id": product_id, "cantidad": 3 }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cart: Value = resp.json().await.expect("Invalid JSON");
    let cart_id = cart["id"].clone();

    let resp = place_order(&customer, &token, &cart_id).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.expect("Invalid JSON");
    let order_id = order["id"].clone();
    assert_eq!(order["status"], "pending");
    // Placing an order reserves nothing
    assert_eq!(stock_of(&pool, product_id).await, 10);

    set_status(&admin, &admin_token, &order_id, "completed").await;
    assert_eq!(stock_of(&pool, product_id).await, 7);

    set_status(&admin, &admin_token, &order_id, "cancelled").await;
    assert_eq!(stock_of(&pool, product_id).await, 10);

    // The checked-out cart is no longer active
    let resp = place_order(&customer, &token, &cart_id).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&pool, product_id).await, 10);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_live_checkout_of_empty_cart_is_rejected() {
    let pool = live_pool().await;
    let customer = client_from("198.51.100.23");
    let email = format!("vacio-{}@davila.pe", tag());
    seed_user(&pool, &email, false).await;
    let token = access_token(&customer, &email).await;

    let resp = customer
        .get(format!("{}/cart", live_base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(cart["items"], json!([]));

    let resp = place_order(&customer, &token, &cart["id"]).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Lockout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_live_three_failed_logins_lock_the_account() {
    let pool = live_pool().await;
    let client = client_from("198.51.100.24");
    let email = format!("bloqueo-{}@davila.pe", tag());
    seed_user(&pool, &email, false).await;

    for attempt in 1..=3 {
        let resp = login(&client, &email, "Clave-Equivocada-1").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "attempt {attempt}");
    }

    // Locked: even the right password is refused
    let resp = login(&client, &email, PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
