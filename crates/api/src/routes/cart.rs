//! Shopping cart handlers. Each user has at most one active cart.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use davila_core::{MAX_STOCK, ProductId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::{Cart, CartResponse};
use crate::models::user::User;
use crate::routes::extract::ValidJson;
use crate::state::AppState;

const PRODUCT_NOT_FOUND: &str = "Producto no encontrado.";

#[derive(Debug, Deserialize, Validate)]
pub struct AddRequest {
    #[validate(required)]
    pub producto_id: Option<ProductId>,
    #[validate(range(
        min = 1,
        max = MAX_STOCK,
        message = "La cantidad debe estar entre 1 y 1000000."
    ))]
    pub cantidad: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuantityRequest {
    #[validate(range(max = MAX_STOCK, message = "La cantidad no puede superar 1000000."))]
    pub cantidad: Option<i32>,
}

async fn render(state: &AppState, user: &User, cart: Cart) -> Result<Json<CartResponse>> {
    let lines = CartRepository::new(state.pool()).lines(cart.id).await?;
    Ok(Json(CartResponse::render(
        cart,
        lines,
        &user.viewer(),
        state.config(),
    )))
}

async fn ensure_product(state: &AppState, id: ProductId) -> Result<()> {
    if ProductRepository::new(state.pool()).exists(id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))
    }
}

/// The caller's active cart, created on first access.
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<CartResponse>> {
    let cart = CartRepository::new(state.pool())
        .get_or_create_active(user.id)
        .await?;
    render(&state, &user, cart).await
}

/// Add units of a product, merging with an existing line.
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AddRequest>,
) -> Result<impl IntoResponse> {
    let product_id = body
        .producto_id
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
    let cantidad = body.cantidad.unwrap_or(1);
    ensure_product(&state, product_id).await?;

    let carts = CartRepository::new(state.pool());
    let cart = carts.get_or_create_active(user.id).await?;
    carts.add_item(cart.id, product_id, cantidad).await?;
    tracing::debug!(user_id = %user.id, product_id = %product_id, cantidad, "Added to cart");

    Ok((StatusCode::CREATED, render(&state, &user, cart).await?))
}

/// Set a line's quantity; zero removes the line.
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    ValidJson(body): ValidJson<QuantityRequest>,
) -> Result<Json<CartResponse>> {
    let cantidad = body.cantidad.unwrap_or(1);
    if cantidad < 0 {
        return Err(AppError::Rejected(
            "La cantidad no puede ser negativa.".to_string(),
        ));
    }

    let carts = CartRepository::new(state.pool());
    let cart = carts
        .active_for(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Carrito no encontrado.".to_string()))?;
    ensure_product(&state, product_id).await?;

    if cantidad == 0 {
        carts.remove_item(cart.id, product_id).await?;
    } else {
        carts.set_quantity(cart.id, product_id, cantidad).await?;
    }
    render(&state, &user, cart).await
}

/// Remove a product from the cart. Removing one that is not there is not
/// an error.
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let carts = CartRepository::new(state.pool());
    let cart = carts.get_or_create_active(user.id).await?;
    ensure_product(&state, product_id).await?;

    let detail = if carts.remove_item(cart.id, product_id).await? {
        "Producto eliminado del carrito."
    } else {
        "El producto ya no estaba en el carrito."
    };
    Ok(Json(json!({ "detail": detail })))
}

pub async fn clear(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let carts = CartRepository::new(state.pool());
    let cart = carts.get_or_create_active(user.id).await?;
    let removed = carts.clear(cart.id).await?;
    tracing::debug!(user_id = %user.id, cart_id = %cart.id, removed, "Cart cleared");
    Ok(Json(json!({ "message": "Carrito vaciado correctamente" })))
}
