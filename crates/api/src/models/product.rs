//! Product domain types.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use davila_core::{PriceVisibility, ProductId, SupplierId};

use super::supplier::split_list;
use crate::config::ApiConfig;

/// How long a product counts as recent after it was flagged or registered.
pub const RECENT_WINDOW: TimeDelta = TimeDelta::days(7);

/// A product row joined with the owning supplier's name and lists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub codigo: String,
    pub imagen: Option<String>,
    pub nombre_producto: String,
    pub descripcion: Option<String>,
    pub proveedor_id: SupplierId,
    pub marca: String,
    pub categoria: String,
    pub procedencia: Option<String>,
    pub precio_unitario: Decimal,
    pub precio_mayoreo: Option<Decimal>,
    pub stock: i32,
    pub fecha_registro: DateTime<Utc>,
    pub es_nuevo: bool,
    pub fecha_novedad: Option<DateTime<Utc>>,
    pub es_destacado: bool,
    pub slug: String,
    pub proveedor_nombre: String,
    pub proveedor_marcas: String,
    pub proveedor_categorias: String,
}

impl Product {
    /// Whether the product was flagged new, or registered, within the last week.
    #[must_use]
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        let since = self.fecha_novedad.unwrap_or(self.fecha_registro);
        now - since <= RECENT_WINDOW
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplierSummary {
    pub id: SupplierId,
    pub nombre_empresa: String,
}

/// Product as shown to a particular viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub codigo: String,
    pub imagen: Option<String>,
    pub nombre_producto: String,
    pub descripcion: Option<String>,
    pub proveedor: SupplierId,
    pub proveedor_detalle: SupplierSummary,
    pub proveedor_marcas: Vec<String>,
    pub proveedor_categorias: Vec<String>,
    pub marca: String,
    pub categoria: String,
    pub procedencia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_unitario: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_mayoreo: Option<Decimal>,
    pub stock: i32,
    pub fecha_registro: DateTime<Utc>,
    pub es_nuevo: bool,
    pub fecha_novedad: Option<DateTime<Utc>>,
    pub es_destacado: bool,
    pub slug: String,
    #[serde(rename = "isNew")]
    pub is_new: bool,
}

impl ProductResponse {
    #[must_use]
    pub fn render(
        product: Product,
        visibility: PriceVisibility,
        config: &ApiConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let is_new = product.is_recent(now);
        let (precio_unitario, precio_mayoreo) =
            visibility.filter(product.precio_unitario, product.precio_mayoreo);

        Self {
            id: product.id,
            codigo: product.codigo,
            imagen: product.imagen.as_deref().map(|path| config.media_url(path)),
            nombre_producto: product.nombre_producto,
            descripcion: product.descripcion,
            proveedor: product.proveedor_id,
            proveedor_detalle: SupplierSummary {
                id: product.proveedor_id,
                nombre_empresa: product.proveedor_nombre,
            },
            proveedor_marcas: split_list(&product.proveedor_marcas),
            proveedor_categorias: split_list(&product.proveedor_categorias),
            marca: product.marca,
            categoria: product.categoria,
            procedencia: product.procedencia,
            precio_unitario,
            precio_mayoreo,
            stock: product.stock,
            fecha_registro: product.fecha_registro,
            es_nuevo: product.es_nuevo,
            fecha_novedad: product.fecha_novedad,
            es_destacado: product.es_destacado,
            slug: product.slug,
            is_new,
        }
    }
}

/// Compact product shape embedded in wishlist entries.
#[derive(Debug, Clone, Serialize)]
pub struct ProductBrief {
    pub id: ProductId,
    pub codigo: String,
    pub imagen: Option<String>,
    pub nombre_producto: String,
    pub procedencia: Option<String>,
    pub stock: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_unitario: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_mayoreo: Option<Decimal>,
}

/// Fields accepted when creating or replacing a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub codigo: String,
    pub nombre_producto: String,
    pub descripcion: Option<String>,
    pub proveedor_id: SupplierId,
    pub marca: String,
    pub categoria: String,
    pub procedencia: Option<String>,
    pub precio_unitario: Decimal,
    pub precio_mayoreo: Option<Decimal>,
    pub stock: i32,
    pub es_nuevo: bool,
    pub fecha_novedad: Option<DateTime<Utc>>,
    pub es_destacado: bool,
}

/// Sort orders accepted by the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrdering {
    PriceAsc,
    PriceDesc,
    RegisteredAsc,
    #[default]
    RegisteredDesc,
}

impl ProductOrdering {
    /// Parse the `ordering` query parameter; unknown values fall back to the default.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("precio_unitario") => Self::PriceAsc,
            Some("-precio_unitario") => Self::PriceDesc,
            Some("fecha_registro") => Self::RegisteredAsc,
            _ => Self::RegisteredDesc,
        }
    }

    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::PriceAsc => "p.precio_unitario ASC, p.id ASC",
            Self::PriceDesc => "p.precio_unitario DESC, p.id DESC",
            Self::RegisteredAsc => "p.fecha_registro ASC, p.id ASC",
            Self::RegisteredDesc => "p.fecha_registro DESC, p.id DESC",
        }
    }
}

/// Filters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub categoria: Option<String>,
    pub marca: Option<String>,
    pub procedencia: Option<String>,
    /// Every term must match name, description, category or brand.
    pub search_terms: Vec<String>,
    pub ordering: ProductOrdering,
}

/// Split a search query on whitespace and commas.
#[must_use]
pub fn search_terms(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn sample(now: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::new(1),
            codigo: "KT-100".to_string(),
            imagen: Some("productos/kit.jpg".to_string()),
            nombre_producto: "Kit de arrastre".to_string(),
            descripcion: None,
            proveedor_id: SupplierId::new(4),
            marca: "Honda".to_string(),
            categoria: "Transmision".to_string(),
            procedencia: Some("Japon".to_string()),
            precio_unitario: Decimal::new(12_050, 2),
            precio_mayoreo: Some(Decimal::new(9_900, 2)),
            stock: 8,
            fecha_registro: now - TimeDelta::days(30),
            es_nuevo: false,
            fecha_novedad: None,
            es_destacado: true,
            slug: "kit-de-arrastre-kt-100".to_string(),
            proveedor_nombre: "Motores SAC".to_string(),
            proveedor_marcas: "Honda, Bajaj".to_string(),
            proveedor_categorias: "Transmision".to_string(),
        }
    }

    #[test]
    fn test_is_recent_uses_novelty_date_first() {
        let now = Utc::now();
        let mut product = sample(now);
        assert!(!product.is_recent(now));

        product.fecha_novedad = Some(now - TimeDelta::days(2));
        assert!(product.is_recent(now));

        product.fecha_novedad = None;
        product.fecha_registro = now - TimeDelta::days(6);
        assert!(product.is_recent(now));
    }

    #[test]
    fn test_render_hides_wholesale_for_anonymous() {
        let now = Utc::now();
        let response = ProductResponse::render(
            sample(now),
            PriceVisibility::for_viewer(None),
            &test_config(),
            now,
        );
        let json = serde_json::to_value(&response).unwrap_or_default();
        assert_eq!(json["precio_unitario"], "120.50");
        assert!(json.get("precio_mayoreo").is_none());
        assert_eq!(json["imagen"], "http://localhost:8000/media/productos/kit.jpg");
        assert_eq!(json["proveedor_detalle"]["nombre_empresa"], "Motores SAC");
        assert_eq!(json["proveedor_marcas"], serde_json::json!(["Honda", "Bajaj"]));
        assert_eq!(json["isNew"], false);
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!(ProductOrdering::parse(Some("-precio_unitario")), ProductOrdering::PriceDesc);
        assert_eq!(ProductOrdering::parse(Some("nonsense")), ProductOrdering::RegisteredDesc);
        assert_eq!(ProductOrdering::parse(None), ProductOrdering::RegisteredDesc);
    }

    #[test]
    fn test_search_terms() {
        assert_eq!(search_terms("freno  honda,disco"), vec!["freno", "honda", "disco"]);
        assert!(search_terms(" , ").is_empty());
    }
}
