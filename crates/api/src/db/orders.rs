//! Order repository.
//!
//! Reads go straight to the pool. Checkout and status changes run inside a
//! caller-owned transaction (see [`crate::services::checkout`]) and lock the
//! product rows they read, so concurrent orders cannot oversell stock.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use davila_core::{CartId, OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem, ShippingDetails, ShippingUpdate};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.code, o.user_id, o.dni, o.phone, o.address, o.city, o.state,
           o.country, o.notes, o.cart_id, o.subtotal, o.shipping, o.total, o.status,
           o.created_at, o.updated_at,
           u.nombre AS user_nombre, u.apellidos AS user_apellidos, u.email AS user_email
    FROM tienda.order o
    JOIN tienda.user u ON u.id = o.user_id
";

/// A cart line as seen by checkout, with the locked product's stock and prices.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub nombre_producto: String,
    pub cantidad: i32,
    pub stock: i32,
    pub precio_unitario: Decimal,
    pub precio_mayoreo: Option<Decimal>,
}

/// An order line whose product still exists, with the locked stock level.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockLine {
    pub product_id: ProductId,
    pub nombre_producto: String,
    pub cantidad: i32,
    pub stock: i32,
}

/// Totals and identity of a new order.
#[derive(Debug, Clone)]
pub struct OrderHeader<'a> {
    pub code: &'a str,
    pub user_id: UserId,
    pub cart_id: CartId,
    pub details: &'a ShippingDetails,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// An order by id, restricted to `owner` when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE o.id = $1 AND ($2::INTEGER IS NULL OR o.user_id = $2)"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Items of the given orders, with the product name and image when the
    /// product still exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for(&self, orders: &[Order]) -> Result<Vec<OrderItem>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();

        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.cantidad, oi.price, oi.subtotal,
                   p.nombre_producto AS producto_nombre, p.imagen AS producto_imagen
            FROM tienda.order_item oi
            LEFT JOIN tienda.product p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Update delivery details; `None` fields are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn update_shipping(
        &self,
        id: OrderId,
        update: &ShippingUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE tienda.order SET
                dni = COALESCE($2, dni),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                city = COALESCE($5, city),
                state = COALESCE($6, state),
                country = COALESCE($7, country),
                notes = COALESCE($8, notes),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&update.dni)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.city)
        .bind(&update.state)
        .bind(&update.country)
        .bind(&update.notes)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tienda.order WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Transactional operations
    // -------------------------------------------------------------------------

    /// Lock the user's cart if it is still active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_active_cart(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
        user_id: UserId,
    ) -> Result<Option<CartId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(
            "SELECT id FROM tienda.cart WHERE id = $1 AND user_id = $2 AND activo FOR UPDATE",
        )
        .bind(cart_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(id)
    }

    /// Cart lines with their products locked for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn checkout_lines(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
    ) -> Result<Vec<CheckoutLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CheckoutLine>(
            r"
            SELECT p.id AS product_id, p.nombre_producto, ci.cantidad, p.stock,
                   p.precio_unitario, p.precio_mayoreo
            FROM tienda.cart_item ci
            JOIN tienda.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY p.id
            FOR UPDATE OF p
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(lines)
    }

    /// Whether an order code is already used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn code_exists(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tienda.order WHERE code = $1)")
                .bind(code)
                .fetch_one(&mut **tx)
                .await?;

        Ok(exists)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        header: &OrderHeader<'_>,
    ) -> Result<OrderId, RepositoryError> {
        let details = header.details;
        let id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO tienda.order (
                code, user_id, dni, phone, address, city, state, country, notes,
                cart_id, subtotal, shipping, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            ",
        )
        .bind(header.code)
        .bind(header.user_id)
        .bind(&details.dni)
        .bind(&details.phone)
        .bind(&details.address)
        .bind(&details.city)
        .bind(&details.state)
        .bind(&details.country)
        .bind(&details.notes)
        .bind(header.cart_id)
        .bind(header.subtotal)
        .bind(header.shipping)
        .bind(header.total)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_item(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        product_id: ProductId,
        cantidad: i32,
        price: Decimal,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO tienda.order_item (order_id, product_id, cantidad, price, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(order_id)
        .bind(product_id)
        .bind(cantidad)
        .bind(price)
        .bind(price * Decimal::from(cantidad))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn deactivate_cart(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE tienda.cart SET activo = FALSE WHERE id = $1")
            .bind(cart_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Lock an order row and return its current status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_status(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
    ) -> Result<Option<OrderStatus>, RepositoryError> {
        let status = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM tienda.order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(status)
    }

    /// Order lines with their (still existing) products locked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_lines(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
    ) -> Result<Vec<StockLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, StockLine>(
            r"
            SELECT p.id AS product_id, p.nombre_producto, oi.cantidad, p.stock
            FROM tienda.order_item oi
            JOIN tienda.product p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY p.id
            FOR UPDATE OF p
            ",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(lines)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_stock(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        stock: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE tienda.product SET stock = $2 WHERE id = $1")
            .bind(product_id)
            .bind(stock)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Set the status and, when given, the notes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
        status: OrderStatus,
        notes: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE tienda.order
            SET status = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(notes)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Begin a transaction on the underlying pool.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        Ok(self.pool.begin().await?)
    }
}
