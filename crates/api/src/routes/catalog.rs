//! Category and brand handlers.
//!
//! The same handlers serve `/categorias` and `/marcas`; each router carries
//! its [`Taxonomy`] as an extension.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::db::{CatalogRepository, RepositoryError, Taxonomy};
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::TaxonomyEntry;
use crate::routes::extract::ValidJson;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct TaxonomyRequest {
    #[validate(length(min = 1, max = 100))]
    pub nombre: Option<String>,
    #[validate(length(max = 100))]
    pub slug: Option<String>,
}

const fn not_found(taxonomy: Taxonomy) -> &'static str {
    match taxonomy {
        Taxonomy::Category => "Categoría no encontrada.",
        Taxonomy::Brand => "Marca no encontrada.",
    }
}

/// Public listing, ordered by name.
pub async fn list(
    State(state): State<AppState>,
    Extension(taxonomy): Extension<Taxonomy>,
) -> Result<Json<Vec<TaxonomyEntry>>> {
    let entries = CatalogRepository::new(state.pool(), taxonomy).list().await?;
    Ok(Json(entries))
}

pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Extension(taxonomy): Extension<Taxonomy>,
    ValidJson(body): ValidJson<TaxonomyRequest>,
) -> Result<impl IntoResponse> {
    let nombre = required_name(body.nombre)?;
    let entry = CatalogRepository::new(state.pool(), taxonomy)
        .create(&nombre, body.slug.as_deref())
        .await?;
    tracing::info!(?taxonomy, id = entry.id, slug = %entry.slug, "Taxonomy entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT: `nombre` is required.
pub async fn replace(
    admin: RequireAdmin,
    state: State<AppState>,
    taxonomy: Extension<Taxonomy>,
    id: Path<i32>,
    ValidJson(body): ValidJson<TaxonomyRequest>,
) -> Result<Json<TaxonomyEntry>> {
    let nombre = required_name(body.nombre)?;
    update(
        admin,
        state,
        taxonomy,
        id,
        TaxonomyRequest {
            nombre: Some(nombre),
            slug: body.slug,
        },
    )
    .await
}

/// PATCH: only the sent fields change.
pub async fn patch(
    admin: RequireAdmin,
    state: State<AppState>,
    taxonomy: Extension<Taxonomy>,
    id: Path<i32>,
    ValidJson(body): ValidJson<TaxonomyRequest>,
) -> Result<Json<TaxonomyEntry>> {
    update(admin, state, taxonomy, id, body).await
}

async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Extension(taxonomy): Extension<Taxonomy>,
    Path(id): Path<i32>,
    body: TaxonomyRequest,
) -> Result<Json<TaxonomyEntry>> {
    let slug = body.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let entry = CatalogRepository::new(state.pool(), taxonomy)
        .update(id, body.nombre.as_deref(), slug)
        .await
        .map_err(missing(taxonomy))?;
    Ok(Json(entry))
}

pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Extension(taxonomy): Extension<Taxonomy>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    CatalogRepository::new(state.pool(), taxonomy)
        .delete(id)
        .await
        .map_err(missing(taxonomy))?;
    tracing::info!(?taxonomy, id, "Taxonomy entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Report an unknown id with the taxonomy's own message.
fn missing(taxonomy: Taxonomy) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(not_found(taxonomy).to_string()),
        other => other.into(),
    }
}

fn required_name(nombre: Option<String>) -> Result<String> {
    nombre
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            AppError::Validation(FieldErrors::single("nombre", "Este campo es requerido."))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_name_trims_and_rejects_blank() {
        assert_eq!(required_name(Some("  Frenos ".to_string())).unwrap(), "Frenos");
        assert!(matches!(
            required_name(Some("   ".to_string())),
            Err(AppError::Validation(_))
        ));
        assert!(required_name(None).is_err());
    }

    #[test]
    fn test_not_found_message_per_taxonomy() {
        assert_eq!(not_found(Taxonomy::Category), "Categoría no encontrada.");
        assert_eq!(not_found(Taxonomy::Brand), "Marca no encontrada.");
    }
}
