//! Supplier management (admin only).

use std::sync::LazyLock;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

use davila_core::{Email, SupplierId, SupplierKind};

use crate::db::SupplierRepository;
use crate::db::suppliers::SupplierFields;
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::RequireAdmin;
use crate::models::supplier::{Supplier, SupplierResponse};
use crate::routes::extract::ValidJson;
use crate::state::AppState;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{7,15}$").expect("Invalid regex"));
static RUC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z-]+$").expect("Invalid regex"));

const SUPPLIER_NOT_FOUND: &str = "Proveedor no encontrado.";
const REQUIRED: &str = "Este campo es requerido.";

/// Supplier body. Every field is optional here so the same type serves
/// full writes (missing fields are reported) and partial updates.
#[derive(Debug, Deserialize, Validate)]
pub struct SupplierRequest {
    #[validate(length(min = 1, max = 200))]
    pub nombre_empresa: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub nombre_contacto: Option<String>,
    #[validate(regex(
        path = *PHONE_RE,
        message = "Ingrese un número de teléfono válido (7 a 15 dígitos, opcionalmente con +)."
    ))]
    pub telefono: Option<String>,
    #[validate(email)]
    pub correo: Option<String>,
    pub direccion: Option<String>,
    #[validate(
        length(min = 1, max = 50),
        regex(
            path = *RUC_RE,
            message = "El RUC/documento solo puede contener letras, números y guiones."
        )
    )]
    pub ruc_documento: Option<String>,
    pub tipo_proveedor: Option<SupplierKind>,
    pub marcas: Option<String>,
    pub categorias: Option<String>,
}

impl SupplierRequest {
    /// Resolve the body into a complete set of fields, taking anything
    /// missing from `base` (partial update) or reporting it as required.
    fn into_fields(self, base: Option<&Supplier>) -> Result<SupplierFields> {
        let mut errors = FieldErrors::new();
        let mut take = |field: &str, value: Option<String>, current: Option<&String>| {
            value.or_else(|| current.cloned()).unwrap_or_else(|| {
                errors.add(field, REQUIRED);
                String::new()
            })
        };

        let nombre_empresa = take(
            "nombre_empresa",
            self.nombre_empresa,
            base.map(|s| &s.nombre_empresa),
        );
        let nombre_contacto = take(
            "nombre_contacto",
            self.nombre_contacto,
            base.map(|s| &s.nombre_contacto),
        );
        let telefono = take("telefono", self.telefono, base.map(|s| &s.telefono));
        let direccion = take("direccion", self.direccion, base.map(|s| &s.direccion));
        let ruc_documento = take(
            "ruc_documento",
            self.ruc_documento,
            base.map(|s| &s.ruc_documento),
        );
        let correo = match (self.correo, base) {
            (Some(raw), _) => Email::parse(&raw).ok(),
            (None, Some(current)) => Some(current.correo.clone()),
            (None, None) => {
                errors.add("correo", REQUIRED);
                None
            }
        };

        let (Some(correo), true) = (correo, errors.is_empty()) else {
            if errors.is_empty() {
                errors.add(
                    "correo",
                    "Introduzca una dirección de correo electrónico válida.",
                );
            }
            return Err(AppError::Validation(errors));
        };

        Ok(SupplierFields {
            nombre_empresa,
            nombre_contacto,
            telefono,
            correo,
            direccion,
            ruc_documento,
            tipo_proveedor: self
                .tipo_proveedor
                .or(base.map(|s| s.tipo_proveedor))
                .unwrap_or_default(),
            marcas: self
                .marcas
                .or_else(|| base.map(|s| s.marcas.clone()))
                .unwrap_or_default(),
            categorias: self
                .categorias
                .or_else(|| base.map(|s| s.categorias.clone()))
                .unwrap_or_default(),
        })
    }
}

pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<SupplierResponse>>> {
    let suppliers = SupplierRepository::new(state.pool()).list().await?;
    Ok(Json(suppliers.into_iter().map(SupplierResponse::from).collect()))
}

pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SupplierRequest>,
) -> Result<impl IntoResponse> {
    let fields = body.into_fields(None)?;
    let supplier = SupplierRepository::new(state.pool()).create(&fields).await?;
    tracing::info!(admin_id = %admin.id, supplier_id = %supplier.id, "Supplier created");
    Ok((StatusCode::CREATED, Json(SupplierResponse::from(supplier))))
}

pub async fn get(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
) -> Result<Json<SupplierResponse>> {
    let supplier = SupplierRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(SUPPLIER_NOT_FOUND.to_string()))?;
    Ok(Json(SupplierResponse::from(supplier)))
}

/// Full replacement: every field must be sent.
pub async fn replace(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
    ValidJson(body): ValidJson<SupplierRequest>,
) -> Result<Json<SupplierResponse>> {
    let repo = SupplierRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound(SUPPLIER_NOT_FOUND.to_string()));
    }
    let fields = body.into_fields(None)?;
    let supplier = repo.update(id, &fields).await?;
    tracing::info!(admin_id = %admin.id, supplier_id = %id, "Supplier replaced");
    Ok(Json(SupplierResponse::from(supplier)))
}

/// Partial update: omitted fields keep their stored values.
pub async fn patch(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
    ValidJson(body): ValidJson<SupplierRequest>,
) -> Result<Json<SupplierResponse>> {
    let repo = SupplierRepository::new(state.pool());
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(SUPPLIER_NOT_FOUND.to_string()))?;
    let fields = body.into_fields(Some(&current))?;
    let supplier = repo.update(id, &fields).await?;
    tracing::info!(admin_id = %admin.id, supplier_id = %id, "Supplier updated");
    Ok(Json(SupplierResponse::from(supplier)))
}

/// 204 on success, 409 while products still reference the supplier.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
) -> Result<StatusCode> {
    SupplierRepository::new(state.pool()).delete(id).await?;
    tracing::info!(admin_id = %admin.id, supplier_id = %id, "Supplier deleted");
    Ok(StatusCode::NO_CONTENT)
}
