//! Database operations for the store's `PostgreSQL`.
//!
//! # Schema: `tienda`
//!
//! - `category`, `brand` - catalog taxonomies
//! - `supplier` - vendors (products keep a restricting FK)
//! - `product` - catalog items with unit and wholesale prices
//! - `user`, `pending_user` - accounts and pre-verification registrations
//! - `cart`, `cart_item` - one active cart per user
//! - `order`, `order_item` - placed orders with snapshotted prices
//! - `wishlist` - saved products
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p davila-cli -- migrate
//! ```

pub mod analytics;
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod pending_users;
pub mod products;
pub mod suppliers;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use analytics::AnalyticsRepository;
pub use carts::CartRepository;
pub use catalog::{CatalogRepository, Taxonomy};
pub use orders::OrderRepository;
pub use pending_users::PendingUserRepository;
pub use products::ProductRepository;
pub use suppliers::SupplierRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// A unique column already holds the submitted value.
    #[error("duplicate value for {field}")]
    Duplicate { field: String },

    /// The row is still referenced by another table.
    #[error("still referenced: {0}")]
    InUse(String),

    /// Constraint violation that does not map to a single field.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a failed write on `table` to a field-level error when the database
/// reports a unique or foreign-key violation.
///
/// Unique constraints follow the default Postgres naming
/// (`{table}_{column}_key`), which is how the offending column is found.
pub(crate) fn map_write_error(table: &str, e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            let field = db_err
                .constraint()
                .and_then(|name| unique_field(table, name))
                .unwrap_or("non_field_errors");
            return RepositoryError::Duplicate {
                field: field.to_owned(),
            };
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::InUse(
                db_err.constraint().unwrap_or(table).to_owned(),
            );
        }
    }
    RepositoryError::Database(e)
}

fn unique_field<'a>(table: &str, constraint: &'a str) -> Option<&'a str> {
    constraint
        .strip_prefix(table)?
        .strip_prefix('_')?
        .strip_suffix("_key")
}

/// Escape `%`, `_` and `\` so user input can be embedded in an `ILIKE` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field_from_constraint_name() {
        assert_eq!(unique_field("supplier", "supplier_correo_key"), Some("correo"));
        assert_eq!(
            unique_field("supplier", "supplier_ruc_documento_key"),
            Some("ruc_documento")
        );
        assert_eq!(unique_field("product", "supplier_correo_key"), None);
        assert_eq!(unique_field("product", "product_pkey"), None);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("freno"), "%freno%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
