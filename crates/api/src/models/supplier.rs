//! Supplier domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use davila_core::{Email, SupplierId, SupplierKind};

/// A vendor the store buys from.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Supplier {
    pub id: SupplierId,
    pub nombre_empresa: String,
    pub nombre_contacto: String,
    pub telefono: String,
    pub correo: Email,
    pub direccion: String,
    pub ruc_documento: String,
    pub tipo_proveedor: SupplierKind,
    pub marcas: String,
    pub categorias: String,
    pub fecha_registro: DateTime<Utc>,
}

/// Supplier as returned by the API, with the comma-separated lists expanded.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierResponse {
    pub id: SupplierId,
    pub nombre_empresa: String,
    pub nombre_contacto: String,
    pub telefono: String,
    pub correo: Email,
    pub direccion: String,
    pub ruc_documento: String,
    pub tipo_proveedor: SupplierKind,
    pub marcas: String,
    pub categorias: String,
    pub marcas_list: Vec<String>,
    pub categorias_list: Vec<String>,
    pub fecha_registro: DateTime<Utc>,
}

impl From<Supplier> for SupplierResponse {
    fn from(s: Supplier) -> Self {
        Self {
            marcas_list: split_list(&s.marcas),
            categorias_list: split_list(&s.categorias),
            id: s.id,
            nombre_empresa: s.nombre_empresa,
            nombre_contacto: s.nombre_contacto,
            telefono: s.telefono,
            correo: s.correo,
            direccion: s.direccion,
            ruc_documento: s.ruc_documento,
            tipo_proveedor: s.tipo_proveedor,
            marcas: s.marcas,
            categorias: s.categorias,
            fecha_registro: s.fecha_registro,
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
