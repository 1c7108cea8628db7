//! Categories and brands.

use serde::Serialize;

/// A category or brand. Both share the same shape and rules.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaxonomyEntry {
    pub id: i32,
    pub nombre: String,
    pub slug: String,
}
