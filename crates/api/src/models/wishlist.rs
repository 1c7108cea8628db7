//! Wishlist domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use davila_core::{PriceVisibility, WishlistId};

use super::product::{Product, ProductBrief};
use crate::config::ApiConfig;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishlistEntry {
    pub wishlist_id: WishlistId,
    pub fecha_agregado: DateTime<Utc>,
    #[sqlx(flatten)]
    pub product: Product,
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistResponse {
    pub id: WishlistId,
    pub producto: ProductBrief,
    pub fecha_agregado: DateTime<Utc>,
}

impl WishlistResponse {
    #[must_use]
    pub fn render(entry: WishlistEntry, visibility: PriceVisibility, config: &ApiConfig) -> Self {
        let product = entry.product;
        let (precio_unitario, precio_mayoreo) =
            visibility.filter(product.precio_unitario, product.precio_mayoreo);

        Self {
            id: entry.wishlist_id,
            producto: ProductBrief {
                id: product.id,
                codigo: product.codigo,
                imagen: product.imagen.as_deref().map(|path| config.media_url(path)),
                nombre_producto: product.nombre_producto,
                procedencia: product.procedencia,
                stock: product.stock,
                precio_unitario,
                precio_mayoreo,
            },
            fecha_agregado: entry.fecha_agregado,
        }
    }
}
