//! Product catalog handlers.
//!
//! Reads are public; prices are filtered for whoever is asking. Writes are
//! admin-only multipart forms with an optional `imagen` file.

mod form;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use davila_core::{PriceVisibility, ProductId};

use crate::db::{ProductRepository, RepositoryError, SupplierRepository};
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::product::{
    NewProduct, Product, ProductFilter, ProductOrdering, ProductResponse, search_terms,
};
use crate::models::user::User;
use crate::state::AppState;

use form::ProductForm;

const PRODUCT_NOT_FOUND: &str = "Producto no encontrado.";

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub categoria: Option<String>,
    pub marca: Option<String>,
    pub procedencia: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            categoria: non_empty(query.categoria),
            marca: non_empty(query.marca),
            procedencia: non_empty(query.procedencia),
            search_terms: query.search.as_deref().map(search_terms).unwrap_or_default(),
            ordering: ProductOrdering::parse(query.ordering.as_deref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeaturedQuery {
    pub nombre: Option<String>,
}

fn visibility(user: Option<&User>) -> PriceVisibility {
    let viewer = user.map(User::viewer);
    PriceVisibility::for_viewer(viewer.as_ref())
}

fn render_all(
    state: &AppState,
    user: Option<&User>,
    products: Vec<Product>,
) -> Json<Vec<ProductResponse>> {
    let visibility = visibility(user);
    let now = Utc::now();
    Json(
        products
            .into_iter()
            .map(|p| ProductResponse::render(p, visibility, state.config(), now))
            .collect(),
    )
}

fn render_one(state: &AppState, user: Option<&User>, product: Product) -> Json<ProductResponse> {
    Json(ProductResponse::render(
        product,
        visibility(user),
        state.config(),
        Utc::now(),
    ))
}

// =============================================================================
// Reads
// =============================================================================

/// Filtered, searchable product listing.
pub async fn list(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductResponse>>> {
    let filter = ProductFilter::from(query);
    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(render_all(&state, user.as_ref(), products))
}

pub async fn new_arrivals(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>> {
    let products = ProductRepository::new(state.pool()).new_arrivals().await?;
    Ok(render_all(&state, user.as_ref(), products))
}

pub async fn featured(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> Result<Json<Vec<ProductResponse>>> {
    let products = ProductRepository::new(state.pool())
        .featured(query.nombre.as_deref())
        .await?;
    Ok(render_all(&state, user.as_ref(), products))
}

/// Newest products of a category.
pub async fn related(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Path(categoria): Path<String>,
) -> Result<Json<Vec<ProductResponse>>> {
    let products = ProductRepository::new(state.pool())
        .related(&categoria, None)
        .await?;
    Ok(render_all(&state, user.as_ref(), products))
}

/// Newest products of a category other than the one being viewed.
pub async fn related_excluding(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Path((categoria, producto_id)): Path<(String, ProductId)>,
) -> Result<Json<Vec<ProductResponse>>> {
    let products = ProductRepository::new(state.pool())
        .related(&categoria, Some(producto_id))
        .await?;
    Ok(render_all(&state, user.as_ref(), products))
}

pub async fn detail(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductResponse>> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
    Ok(render_one(&state, user.as_ref(), product))
}

// =============================================================================
// Writes (admin)
// =============================================================================

/// Create a product from a multipart form.
#[tracing::instrument(skip_all)]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = ProductForm::read(multipart).await?;
    form.check_image()?;
    let fields = form.to_fields(None)?;
    ensure_supplier(&state, &fields).await?;

    let imagen = match &form.imagen {
        Some(upload) => Some(
            state
                .media()
                .save_product_image(upload.file_name.as_deref(), &upload.bytes)
                .await?,
        ),
        None => None,
    };

    let product = match ProductRepository::new(state.pool())
        .create(&fields, imagen.as_deref())
        .await
    {
        Ok(product) => product,
        Err(e) => {
            if let Some(path) = &imagen {
                state.media().remove(path).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        admin_id = %admin.id,
        product_id = %product.id,
        slug = %product.slug,
        "Product created"
    );
    Ok((
        StatusCode::CREATED,
        render_one(&state, Some(&admin), product),
    ))
}

/// PUT: the full form is required.
pub async fn replace(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<ProductResponse>> {
    let form = ProductForm::read(multipart).await?;
    form.check_image()?;
    let current = load(&state, id).await?;
    let fields = form.to_fields(None)?;
    save(&state, &admin, current, &fields, &form).await
}

/// PATCH: only the sent fields change.
pub async fn patch(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<ProductResponse>> {
    let form = ProductForm::read(multipart).await?;
    form.check_image()?;
    let current = load(&state, id).await?;
    let fields = form.to_fields(Some(&current))?;
    save(&state, &admin, current, &fields, &form).await
}

/// Delete a product and its image file.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let imagen = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found)?;
    if let Some(path) = imagen {
        state.media().remove(&path).await;
    }
    tracing::info!(admin_id = %admin.id, product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))
}

/// Store the new image, write the fields, then point the product at the
/// image. A failed write removes the stored file again.
async fn save(
    state: &AppState,
    admin: &User,
    current: Product,
    fields: &NewProduct,
    form: &ProductForm,
) -> Result<Json<ProductResponse>> {
    if fields.proveedor_id != current.proveedor_id {
        ensure_supplier(state, fields).await?;
    }

    let stored = match &form.imagen {
        Some(upload) => Some(
            state
                .media()
                .save_product_image(upload.file_name.as_deref(), &upload.bytes)
                .await?,
        ),
        None => None,
    };

    let repo = ProductRepository::new(state.pool());
    let mut product = match repo.update(current.id, fields).await {
        Ok(product) => product,
        Err(e) => {
            if let Some(path) = &stored {
                state.media().remove(path).await;
            }
            return Err(not_found(e));
        }
    };

    if let Some(path) = stored {
        match repo.replace_image(product.id, &path).await {
            Ok(previous) => {
                if let Some(old) = previous.filter(|old| *old != path) {
                    state.media().remove(&old).await;
                }
                product.imagen = Some(path);
            }
            Err(e) => {
                state.media().remove(&path).await;
                return Err(not_found(e));
            }
        }
    }

    tracing::info!(admin_id = %admin.id, product_id = %product.id, "Product updated");
    Ok(render_one(state, Some(admin), product))
}

async fn ensure_supplier(state: &AppState, fields: &NewProduct) -> Result<()> {
    if SupplierRepository::new(state.pool())
        .get(fields.proveedor_id)
        .await?
        .is_none()
    {
        return Err(AppError::Validation(FieldErrors::single(
            "proveedor",
            format!(
                "Clave primaria \"{}\" inválida - objeto no existe.",
                fields.proveedor_id
            ),
        )));
    }
    Ok(())
}

fn not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound(PRODUCT_NOT_FOUND.to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_filter_drops_blank_values() {
        let filter = ProductFilter::from(ProductQuery {
            categoria: Some("  ".to_string()),
            marca: Some("Honda".to_string()),
            procedencia: None,
            search: Some("pastilla, freno".to_string()),
            ordering: Some("-precio_unitario".to_string()),
        });
        assert_eq!(filter.categoria, None);
        assert_eq!(filter.marca.as_deref(), Some("Honda"));
        assert_eq!(filter.search_terms, vec!["pastilla", "freno"]);
        assert_eq!(filter.ordering, ProductOrdering::PriceDesc);
    }

    #[test]
    fn test_default_query_is_newest_first() {
        let filter = ProductFilter::from(ProductQuery::default());
        assert!(filter.search_terms.is_empty());
        assert_eq!(filter.ordering, ProductOrdering::RegisteredDesc);
    }

    #[test]
    fn test_anonymous_visibility_is_unit_only() {
        let v = visibility(None);
        assert!(v.unit);
        assert!(!v.wholesale);
    }
}
