//! Categories and brands.
//!
//! Both tables have the same shape, so one repository serves both and the
//! table is chosen through [`Taxonomy`].

use sqlx::PgPool;

use davila_core::slug::{name_slug, unique_slug};

use super::{RepositoryError, map_write_error};
use crate::models::catalog::TaxonomyEntry;

/// Which taxonomy table to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Category,
    Brand,
}

impl Taxonomy {
    const fn table(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Brand => "brand",
        }
    }
}

pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
    taxonomy: Taxonomy,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, taxonomy: Taxonomy) -> Self {
        Self { pool, taxonomy }
    }

    /// All entries ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<TaxonomyEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, TaxonomyEntry>(&format!(
            "SELECT id, nombre, slug FROM tienda.{} ORDER BY nombre",
            self.taxonomy.table()
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Create an entry. When `slug` is empty it is derived from the name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` if the name or slug is taken.
    pub async fn create(
        &self,
        nombre: &str,
        slug: Option<&str>,
    ) -> Result<TaxonomyEntry, RepositoryError> {
        let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => explicit.to_owned(),
            None => self.free_slug(&name_slug(nombre)).await?,
        };

        sqlx::query_as::<_, TaxonomyEntry>(&format!(
            "INSERT INTO tienda.{} (nombre, slug) VALUES ($1, $2) RETURNING id, nombre, slug",
            self.taxonomy.table()
        ))
        .bind(nombre)
        .bind(&slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(self.taxonomy.table(), e))
    }

    /// Rename an entry and optionally change its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Duplicate` if the new name or slug is taken.
    pub async fn update(
        &self,
        id: i32,
        nombre: Option<&str>,
        slug: Option<&str>,
    ) -> Result<TaxonomyEntry, RepositoryError> {
        sqlx::query_as::<_, TaxonomyEntry>(&format!(
            r"
            UPDATE tienda.{}
            SET nombre = COALESCE($2, nombre), slug = COALESCE($3, slug)
            WHERE id = $1
            RETURNING id, nombre, slug
            ",
            self.taxonomy.table()
        ))
        .bind(id)
        .bind(nombre)
        .bind(slug)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(self.taxonomy.table(), e))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query(&format!(
            "DELETE FROM tienda.{} WHERE id = $1",
            self.taxonomy.table()
        ))
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn free_slug(&self, base: &str) -> Result<String, RepositoryError> {
        let taken: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT slug FROM tienda.{} WHERE slug = $1 OR slug LIKE $1 || '-%'",
            self.taxonomy.table()
        ))
        .bind(base)
        .fetch_all(self.pool)
        .await?;

        Ok(unique_slug(base, |candidate| taken.iter().any(|t| t == candidate)))
    }
}
