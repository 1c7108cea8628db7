//! Cart repository.

use sqlx::PgPool;

use davila_core::{CartId, MAX_STOCK, ProductId, UserId};

use super::RepositoryError;
use super::products::{PRODUCT_COLUMNS, PRODUCT_JOIN};
use crate::models::cart::{Cart, CartLine};

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's active cart, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_for(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, creado, activo FROM tienda.cart WHERE user_id = $1 AND activo",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(cart)
    }

    /// The user's active cart, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_active(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO tienda.cart (user_id) VALUES ($1)
            ON CONFLICT (user_id) WHERE activo DO NOTHING
            ",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        self.active_for(user_id)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption("active cart vanished".to_owned()))
    }

    /// Items of a cart with their current product data, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(&format!(
            r"
            SELECT ci.id AS item_id, ci.cantidad, {PRODUCT_COLUMNS}
            FROM tienda.cart_item ci
            JOIN {PRODUCT_JOIN} ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            "
        ))
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(lines)
    }

    /// Add `cantidad` units of a product, merging with an existing line. The
    /// merged quantity is capped at `MAX_STOCK`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        cantidad: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO tienda.cart_item (cart_id, product_id, cantidad)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET cantidad = LEAST(tienda.cart_item.cantidad + EXCLUDED.cantidad, $4)
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(cantidad)
        .bind(MAX_STOCK)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Set the quantity of a product in the cart, creating the line if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        cantidad: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO tienda.cart_item (cart_id, product_id, cantidad)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET cantidad = EXCLUDED.cantidad
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(cantidad)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove a product from the cart. Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM tienda.cart_item WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM tienda.cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
