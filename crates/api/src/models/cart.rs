//! Shopping cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use davila_core::price::{cart_line_subtotal, cart_total};
use davila_core::{CartId, CartItemId, PriceVisibility, UserId, Viewer};

use super::product::{Product, ProductResponse};
use crate::config::ApiConfig;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub creado: DateTime<Utc>,
    pub activo: bool,
}

/// One cart item together with its current product data.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub cantidad: i32,
    #[sqlx(flatten)]
    pub product: Product,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub producto: ProductResponse,
    pub cantidad: i32,
    pub subtotal: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub id: CartId,
    pub user: UserId,
    pub creado: DateTime<Utc>,
    pub items: Vec<CartItemResponse>,
    pub total: Option<Decimal>,
}

impl CartResponse {
    /// Render a cart for its owner, applying their price permissions.
    #[must_use]
    pub fn render(cart: Cart, lines: Vec<CartLine>, viewer: &Viewer, config: &ApiConfig) -> Self {
        let now = Utc::now();
        let visibility = PriceVisibility::for_viewer(Some(viewer));
        let total = cart_total(
            Some(viewer),
            lines
                .iter()
                .map(|l| (l.cantidad, l.product.precio_unitario, l.product.precio_mayoreo)),
        );

        let items = lines
            .into_iter()
            .map(|line| {
                let subtotal = cart_line_subtotal(
                    Some(viewer),
                    line.cantidad,
                    line.product.precio_unitario,
                    line.product.precio_mayoreo,
                );
                CartItemResponse {
                    id: line.item_id,
                    producto: ProductResponse::render(line.product, visibility, config, now),
                    cantidad: line.cantidad,
                    subtotal,
                }
            })
            .collect();

        Self {
            id: cart.id,
            user: cart.user_id,
            creado: cart.creado,
            items,
            total,
        }
    }
}
