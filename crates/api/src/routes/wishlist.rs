//! Wishlist handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use davila_core::{PriceVisibility, ProductId};

use crate::db::{RepositoryError, WishlistRepository};
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::RequireAuth;
use crate::models::wishlist::WishlistResponse;
use crate::routes::extract::ValidJson;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddRequest {
    #[validate(required)]
    pub producto_id: Option<ProductId>,
}

/// Saved products, most recent first.
pub async fn list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<WishlistResponse>>> {
    let entries = WishlistRepository::new(state.pool()).list(user.id).await?;
    let visibility = PriceVisibility::for_viewer(Some(&user.viewer()));
    Ok(Json(
        entries
            .into_iter()
            .map(|entry| WishlistResponse::render(entry, visibility, state.config()))
            .collect(),
    ))
}

/// Save a product. Saving it again returns the existing entry.
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AddRequest>,
) -> Result<impl IntoResponse> {
    let Some(product_id) = body.producto_id else {
        return Err(AppError::Validation(FieldErrors::single(
            "producto_id",
            "Este campo es requerido.",
        )));
    };

    let (entry, inserted) = WishlistRepository::new(state.pool())
        .add(user.id, product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::Validation(FieldErrors::single(
                "producto_id",
                format!("Clave primaria \"{product_id}\" inválida - objeto no existe."),
            )),
            other => other.into(),
        })?;
    tracing::debug!(user_id = %user.id, product_id = %product_id, inserted, "Wishlist add");

    let visibility = PriceVisibility::for_viewer(Some(&user.viewer()));
    Ok((
        StatusCode::CREATED,
        Json(WishlistResponse::render(entry, visibility, state.config())),
    ))
}

/// 204 when removed, 404 when the product was not saved.
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    if WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(
            "Producto no encontrado en wishlist.".to_string(),
        ))
    }
}
