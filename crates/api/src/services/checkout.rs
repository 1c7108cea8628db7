//! Checkout and order status changes.
//!
//! Both run in a single transaction. The product rows involved are locked
//! with `FOR UPDATE`, so stock checks and stock movements see a consistent
//! value even when several orders touch the same product.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use davila_core::price::checkout_unit_price;
use davila_core::{CartId, OrderId, OrderStatus, StockMovement};

use crate::db::orders::OrderHeader;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::order::{ShippingDetails, generate_order_code};
use crate::models::user::User;

/// Attempts at drawing an unused order code before giving up.
const CODE_ATTEMPTS: usize = 10;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart does not exist, belongs to someone else, or was already
    /// turned into an order.
    #[error("cart is not available for checkout")]
    CartUnavailable,

    #[error("cart is empty")]
    EmptyCart,

    /// A product has fewer units in stock than requested.
    #[error("insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("order not found")]
    OrderNotFound,

    #[error("could not allocate an order code")]
    CodeExhausted,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Result of an admin status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub previous: OrderStatus,
    pub current: OrderStatus,
    pub movement: Option<StockMovement>,
}

pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Turn the buyer's active cart into an order.
    ///
    /// Every line is priced for the buyer, the order total is the item
    /// subtotal plus `shipping`, and the cart is deactivated. Stock is only
    /// checked here; it moves when an admin advances the order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::CartUnavailable`, `CheckoutError::EmptyCart`
    /// or `CheckoutError::InsufficientStock` when the order cannot be placed.
    pub async fn place_order(
        &self,
        buyer: &User,
        cart_id: CartId,
        details: &ShippingDetails,
        shipping: Decimal,
    ) -> Result<OrderId, CheckoutError> {
        let mut tx = self.orders.begin().await?;

        OrderRepository::lock_active_cart(&mut tx, cart_id, buyer.id)
            .await?
            .ok_or(CheckoutError::CartUnavailable)?;

        let lines = OrderRepository::checkout_lines(&mut tx, cart_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(short) = lines.iter().find(|line| line.stock < line.cantidad) {
            return Err(CheckoutError::InsufficientStock(
                short.nombre_producto.clone(),
            ));
        }

        let viewer = buyer.viewer();
        let priced: Vec<_> = lines
            .iter()
            .map(|line| {
                let price =
                    checkout_unit_price(&viewer, line.precio_unitario, line.precio_mayoreo);
                (line, price)
            })
            .collect();
        let subtotal: Decimal = priced
            .iter()
            .map(|(line, price)| *price * Decimal::from(line.cantidad))
            .sum();

        let mut code = None;
        for _ in 0..CODE_ATTEMPTS {
            let candidate = generate_order_code();
            if !OrderRepository::code_exists(&mut tx, &candidate).await? {
                code = Some(candidate);
                break;
            }
        }
        let code = code.ok_or(CheckoutError::CodeExhausted)?;

        let order_id = OrderRepository::insert(
            &mut tx,
            &OrderHeader {
                code: &code,
                user_id: buyer.id,
                cart_id,
                details,
                subtotal,
                shipping,
                total: subtotal + shipping,
            },
        )
        .await?;

        for (line, price) in &priced {
            OrderRepository::insert_item(&mut tx, order_id, line.product_id, line.cantidad, *price)
                .await?;
        }
        OrderRepository::deactivate_cart(&mut tx, cart_id).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            code = %code,
            user_id = %buyer.id,
            items = priced.len(),
            total = %(subtotal + shipping),
            "Order placed"
        );
        Ok(order_id)
    }

    /// Change an order's status (and optionally its notes), moving stock as
    /// the transition requires.
    ///
    /// Lines whose product is short on stock are skipped during a deduction
    /// and logged; stock never goes negative.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` for an unknown id.
    pub async fn change_status(
        &self,
        id: OrderId,
        status: Option<OrderStatus>,
        notes: Option<&str>,
    ) -> Result<StatusChange, CheckoutError> {
        let mut tx = self.orders.begin().await?;

        let previous = OrderRepository::lock_status(&mut tx, id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;
        let current = status.unwrap_or(previous);
        let movement = StockMovement::for_transition(previous, current);

        if let Some(movement) = movement {
            for line in OrderRepository::stock_lines(&mut tx, id).await? {
                match movement.apply(line.stock, line.cantidad) {
                    Some(stock) => {
                        OrderRepository::set_stock(&mut tx, line.product_id, stock).await?;
                        tracing::info!(
                            order_id = %id,
                            product_id = %line.product_id,
                            movement = ?movement,
                            quantity = line.cantidad,
                            stock,
                            "Stock adjusted"
                        );
                    }
                    None => {
                        tracing::warn!(
                            order_id = %id,
                            product_id = %line.product_id,
                            producto = %line.nombre_producto,
                            stock = line.stock,
                            quantity = line.cantidad,
                            "Insufficient stock, line skipped"
                        );
                    }
                }
            }
        }

        OrderRepository::set_status(&mut tx, id, current, notes).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            from = %previous,
            to = %current,
            "Order status updated"
        );
        Ok(StatusChange {
            previous,
            current,
            movement,
        })
    }
}
