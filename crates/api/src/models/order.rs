//! Order domain types.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

use davila_core::{CartId, Email, OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use crate::config::ApiConfig;

/// Length of the public order code.
pub const ORDER_CODE_LEN: usize = 8;
const ORDER_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random order code such as `K7Q2ZB90`.
#[must_use]
pub fn generate_order_code() -> String {
    let mut rng = rand::rng();
    (0..ORDER_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ORDER_CODE_ALPHABET.len());
            char::from(ORDER_CODE_ALPHABET.get(idx).copied().unwrap_or(b'X'))
        })
        .collect()
}

/// An order joined with its customer's contact data.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub code: String,
    pub user_id: UserId,
    pub dni: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub notes: Option<String>,
    pub cart_id: Option<CartId>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_nombre: Option<String>,
    pub user_apellidos: Option<String>,
    pub user_email: Email,
}

/// An order line; the product may have been deleted since.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub cantidad: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub producto_nombre: Option<String>,
    pub producto_imagen: Option<String>,
}

/// Delivery details supplied at checkout.
#[derive(Debug, Clone)]
pub struct ShippingDetails {
    pub dni: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub notes: Option<String>,
}

/// Partial update of an order's delivery details.
#[derive(Debug, Clone, Default)]
pub struct ShippingUpdate {
    pub dni: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub producto: Option<ProductId>,
    pub producto_nombre: Option<String>,
    pub producto_imagen: Option<String>,
    pub cantidad: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub code: String,
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub email: Email,
    pub dni: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub notes: Option<String>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

impl OrderResponse {
    /// Combine an order with its items. Items of other orders are ignored.
    #[must_use]
    pub fn render(order: Order, items: &[OrderItem], config: &ApiConfig) -> Self {
        let items = items
            .iter()
            .filter(|item| item.order_id == order.id)
            .map(|item| OrderItemResponse {
                id: item.id,
                producto: item.product_id,
                producto_nombre: item.producto_nombre.clone(),
                producto_imagen: item.producto_imagen.as_deref().map(|p| config.media_url(p)),
                cantidad: item.cantidad,
                price: item.price,
                subtotal: item.subtotal,
            })
            .collect();

        Self {
            id: order.id,
            code: order.code,
            nombre: order.user_nombre,
            apellidos: order.user_apellidos,
            email: order.user_email,
            dni: order.dni,
            phone: order.phone,
            address: order.address,
            city: order.city,
            state: order.state,
            country: order.country,
            notes: order.notes,
            subtotal: order.subtotal,
            shipping: order.shipping,
            total: order.total,
            status: order.status,
            items,
            created_at: order.created_at,
        }
    }

    /// Render several orders from one batch of items.
    #[must_use]
    pub fn render_all(orders: Vec<Order>, items: &[OrderItem], config: &ApiConfig) -> Vec<Self> {
        orders
            .into_iter()
            .map(|order| Self::render(order, items, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_code_shape() {
        for _ in 0..20 {
            let code = generate_order_code();
            assert_eq!(code.len(), ORDER_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}
