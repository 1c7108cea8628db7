//! Wishlist repository.

use sqlx::PgPool;

use davila_core::{ProductId, UserId};

use super::RepositoryError;
use super::products::{PRODUCT_COLUMNS, PRODUCT_JOIN};
use crate::models::wishlist::WishlistEntry;

pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's wishlist, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, WishlistEntry>(&format!(
            r"
            SELECT w.id AS wishlist_id, w.fecha_agregado, {PRODUCT_COLUMNS}
            FROM tienda.wishlist w
            JOIN {PRODUCT_JOIN} ON p.id = w.product_id
            WHERE w.user_id = $1
            ORDER BY w.fecha_agregado DESC, w.id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Add a product. Adding one that is already listed returns the existing
    /// entry. The flag is true when a new entry was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(WishlistEntry, bool), RepositoryError> {
        let inserted = sqlx::query(
            r"
            INSERT INTO tienda.wishlist (user_id, product_id)
            SELECT $1, id FROM tienda.product WHERE id = $2
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?
        .rows_affected()
            > 0;

        let entry = sqlx::query_as::<_, WishlistEntry>(&format!(
            r"
            SELECT w.id AS wishlist_id, w.fecha_agregado, {PRODUCT_COLUMNS}
            FROM tienda.wishlist w
            JOIN {PRODUCT_JOIN} ON p.id = w.product_id
            WHERE w.user_id = $1 AND w.product_id = $2
            "
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok((entry, inserted))
    }

    /// Remove a product. Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM tienda.wishlist WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
