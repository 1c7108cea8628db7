//! Account administration and the user's own profile.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use davila_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::user::{User, UserProfile};
use crate::routes::extract::ValidJson;
use crate::state::AppState;

const USER_NOT_FOUND: &str = "Usuario no encontrado.";

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 150))]
    pub nombre: Option<String>,
    #[validate(length(max = 150))]
    pub apellidos: Option<String>,
    #[validate(length(max = 255))]
    pub direccion: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PricePermission {
    pub puede_ver_precios: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WholesalePermission {
    pub puede_ver_precios_mayoreo: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BlockRequest {
    pub is_active: Option<bool>,
}

/// Customer accounts (staff excluded).
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>> {
    let users = UserRepository::new(state.pool()).list_customers().await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

pub async fn profile(RequireAuth(user): RequireAuth) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// Update the caller's name and address.
pub async fn update_profile(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    let updated = UserRepository::new(state.pool())
        .update_profile(
            user.id,
            body.nombre.as_deref(),
            body.apellidos.as_deref(),
            body.direccion.as_deref(),
        )
        .await?;
    Ok(Json(UserProfile::from(&updated)))
}

/// Grant or revoke the retail price permission.
pub async fn set_price_permission(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ValidJson(body): ValidJson<PricePermission>,
) -> Result<impl IntoResponse> {
    let repo = UserRepository::new(state.pool());
    existing(&repo, id).await?;
    let allowed = body.puede_ver_precios.ok_or_else(|| {
        AppError::BadRequest("Debes enviar el campo 'puede_ver_precios'.".to_string())
    })?;

    let user = repo.set_price_access(id, allowed).await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, allowed, "Price permission updated");

    Ok(Json(json!({
        "message": format!("Permiso actualizado correctamente para {}.", user.email),
    })))
}

/// Grant or revoke the wholesale price permission.
pub async fn set_wholesale_permission(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ValidJson(body): ValidJson<WholesalePermission>,
) -> Result<impl IntoResponse> {
    let repo = UserRepository::new(state.pool());
    existing(&repo, id).await?;
    let allowed = body.puede_ver_precios_mayoreo.ok_or_else(|| {
        AppError::BadRequest("Debes enviar el campo 'puede_ver_precios_mayoreo'.".to_string())
    })?;

    let user = repo.set_wholesale_access(id, allowed).await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, allowed, "Wholesale permission updated");

    Ok(Json(json!({
        "id": user.id,
        "puede_ver_precios_mayoreo": user.puede_ver_precios_mayoreo,
        "mensaje": format!("Permiso actualizado para {}", user.email),
    })))
}

/// Deactivate or reactivate an account.
pub async fn block_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ValidJson(body): ValidJson<BlockRequest>,
) -> Result<impl IntoResponse> {
    let repo = UserRepository::new(state.pool());
    existing(&repo, id).await?;
    let is_active = body.is_active.ok_or_else(|| {
        AppError::Rejected("Debe incluir el campo 'is_active' (true o false).".to_string())
    })?;

    let user = repo.set_active(id, is_active).await?;
    let action = if is_active { "desbloqueado" } else { "bloqueado" };
    tracing::info!(admin_id = %admin.id, user_id = %id, is_active, "User {action}");

    Ok(Json(json!({
        "message": format!("El usuario {} fue {action} correctamente.", user.email),
    })))
}

async fn existing(repo: &UserRepository<'_>, id: UserId) -> Result<User> {
    repo.get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))
}
