//! HTTP route handlers for the store API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (database)
//!
//! # Accounts (rate limited)
//! POST /register                            - Start a registration, emails a code
//! POST /verify                              - Confirm the code, creates the user
//! POST /resend-code                         - Issue a fresh code
//! POST /auth/login                          - Tokens in body and cookies
//! POST /auth/logout                         - Clear token cookies
//! POST /api/token/refresh                   - New access token
//! POST /api/token/verify                    - Check a token
//! POST /password-reset                      - Email a reset link
//! POST /password-reset/validate-token       - Check a reset link
//! POST /password-reset/confirm              - Set the new password
//! GET  /api/user-info                       - Caller summary
//!
//! # Users
//! GET   /usuarios                           - Customers (admin)
//! GET   /usuarios/perfil                    - Own profile
//! PATCH /usuarios/perfil                    - Edit own profile
//! PATCH /usuarios/{id}/permiso              - Unit price permission (admin)
//! PATCH /usuarios/{id}/asignar-precio-mayoreo - Wholesale permission (admin)
//!
//! # Suppliers (admin)
//! GET    /proveedores                       - List
//! POST   /proveedores/create                - Create
//! GET    /proveedores/{id}                  - Detail
//! PUT    /proveedores/{id}/update           - Replace
//! PATCH  /proveedores/{id}/update           - Partial update
//! DELETE /proveedores/{id}/delete           - Delete unless products reference it
//!
//! # Categories and brands (same shape under /categorias and /marcas)
//! GET        /categorias                    - List
//! POST       /categorias/create             - Create (admin)
//! PUT|PATCH  /categorias/{id}/update        - Update (admin)
//! DELETE     /categorias/{id}/delete        - Delete (admin)
//!
//! # Products
//! GET    /productos                         - Filtered listing
//! GET    /productos/nuevos                  - Registered in the last 30 days
//! GET    /productos/destacados              - Featured, optionally by name
//! GET    /productos/relacionados/{categoria} - Same category
//! GET    /productos/relacionados/{categoria}/{producto_id} - Same category, excluding one
//! POST   /productos/create                  - Create, multipart (admin)
//! GET    /productos/{producto}              - Detail by slug
//! PUT|PATCH /productos/{producto}/update    - Update by id, multipart (admin)
//! DELETE /productos/{producto}/delete       - Delete by id (admin)
//!
//! # Cart
//! GET       /cart                           - Active cart
//! POST      /cart/add                       - Add units
//! PUT|PATCH /cart/update/{producto_id}      - Set quantity, zero removes
//! DELETE    /cart/remove/{producto_id}      - Remove a line
//! DELETE    /cart/clear                     - Empty the cart
//!
//! # Wishlist
//! GET    /wishlist                          - Saved products
//! POST   /wishlist/add                      - Save a product
//! DELETE /wishlist/{producto_id}/delete     - Remove a product
//!
//! # Orders
//! GET       /orders, /mis-pedidos           - Own orders
//! POST      /orders/create                  - Checkout the active cart
//! GET       /orders/{id}                    - Own order
//! PUT|PATCH /orders/{id}/update             - Edit delivery details
//! DELETE    /orders/{id}/delete             - Delete a pending or cancelled order
//!
//! # Admin
//! GET    /admin/orders                      - All orders
//! GET    /admin/orders/{id}                 - Any order
//! PUT|PATCH /admin/orders/{id}/update       - Change status
//! DELETE /admin/orders/{id}/delete          - Delete
//! GET    /admin/proveedor-stats             - Monthly sales by supplier
//! POST   /admin/block-user/{id}             - Block or unblock a user
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod extract;
pub mod orders;
pub mod products;
pub mod suppliers;
pub mod users;
pub mod wishlist;

use axum::{
    Extension, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::map_response,
    routing::{delete, get, patch, post, put},
};

use crate::db::Taxonomy;
use crate::middleware::{api_rate_limiter, auth_rate_limiter, json_rate_limit_response};
use crate::services::media::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Multipart bodies carry the image plus the text fields.
const PRODUCT_FORM_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Account routes, behind the strict per-IP limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/verify", post(auth::verify))
        .route("/resend-code", post(auth::resend_code))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/api/token/refresh", post(auth::refresh_token))
        .route("/api/token/verify", post(auth::verify_token))
        .route("/password-reset", post(auth::request_password_reset))
        .route(
            "/password-reset/validate-token",
            post(auth::validate_reset_token),
        )
        .route("/password-reset/confirm", post(auth::confirm_password_reset))
        .layer(auth_rate_limiter())
        .layer(map_response(json_rate_limit_response))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user-info", get(auth::user_info))
        .route("/usuarios", get(users::list))
        .route(
            "/usuarios/perfil",
            get(users::profile).patch(users::update_profile),
        )
        .route("/usuarios/{id}/permiso", patch(users::set_price_permission))
        .route(
            "/usuarios/{id}/asignar-precio-mayoreo",
            patch(users::set_wholesale_permission),
        )
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(suppliers::list))
        .route("/create", post(suppliers::create))
        .route("/{id}", get(suppliers::get))
        .route(
            "/{id}/update",
            put(suppliers::replace).patch(suppliers::patch),
        )
        .route("/{id}/delete", delete(suppliers::delete))
}

/// Category and brand routes share handlers; the taxonomy rides along as an
/// extension.
pub fn taxonomy_routes(taxonomy: Taxonomy) -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list))
        .route("/create", post(catalog::create))
        .route("/{id}/update", put(catalog::replace).patch(catalog::patch))
        .route("/{id}/delete", delete(catalog::delete))
        .layer(Extension(taxonomy))
}

pub fn product_routes() -> Router<AppState> {
    let writes = Router::new()
        .route("/create", post(products::create))
        .route(
            "/{producto}/update",
            put(products::replace).patch(products::patch),
        )
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT));

    Router::new()
        .route("/", get(products::list))
        .route("/nuevos", get(products::new_arrivals))
        .route("/destacados", get(products::featured))
        .route("/relacionados/{categoria}", get(products::related))
        .route(
            "/relacionados/{categoria}/{producto_id}",
            get(products::related_excluding),
        )
        .route("/{producto}", get(products::detail))
        .route("/{producto}/delete", delete(products::delete))
        .merge(writes)
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route(
            "/update/{producto_id}",
            put(cart::update).patch(cart::update),
        )
        .route("/remove/{producto_id}", delete(cart::remove))
        .route("/clear", delete(cart::clear))
}

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::list))
        .route("/add", post(wishlist::add))
        .route("/{producto_id}/delete", delete(wishlist::remove))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/create", post(orders::create))
        .route("/{id}", get(orders::detail))
        .route("/{id}/update", put(orders::update).patch(orders::update))
        .route("/{id}/delete", delete(orders::delete))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}", get(admin::order_detail))
        .route(
            "/orders/{id}/update",
            put(admin::update_order).patch(admin::update_order),
        )
        .route("/orders/{id}/delete", delete(admin::delete_order))
        .route("/proveedor-stats", get(admin::supplier_stats))
        .route("/block-user/{id}", post(users::block_user))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(user_routes())
        .nest("/proveedores", supplier_routes())
        .nest("/categorias", taxonomy_routes(Taxonomy::Category))
        .nest("/marcas", taxonomy_routes(Taxonomy::Brand))
        .nest("/productos", product_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/orders", order_routes())
        .route("/mis-pedidos", get(orders::list))
        .nest("/admin", admin_routes())
        .layer(api_rate_limiter())
        .layer(map_response(json_rate_limit_response));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth_routes())
        .merge(api)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
