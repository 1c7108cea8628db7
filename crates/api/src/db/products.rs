//! Product repository.
//!
//! Every read joins the owning supplier so a [`Product`] carries the
//! supplier name and lists shown alongside it.

use sqlx::{PgPool, Postgres, QueryBuilder};

use davila_core::ProductId;
use davila_core::slug::{product_slug, unique_slug};

use super::{RepositoryError, like_pattern, map_write_error};
use crate::models::product::{NewProduct, Product, ProductFilter};

/// Product columns plus the joined supplier fields, for `FROM tienda.product p
/// JOIN tienda.supplier s`.
pub(crate) const PRODUCT_COLUMNS: &str = r"
    p.id, p.codigo, p.imagen, p.nombre_producto, p.descripcion, p.proveedor_id,
    p.marca, p.categoria, p.procedencia, p.precio_unitario, p.precio_mayoreo,
    p.stock, p.fecha_registro, p.es_nuevo, p.fecha_novedad, p.es_destacado, p.slug,
    s.nombre_empresa AS proveedor_nombre,
    s.marcas AS proveedor_marcas,
    s.categorias AS proveedor_categorias
";

pub(crate) const PRODUCT_JOIN: &str =
    "tienda.product p JOIN tienda.supplier s ON s.id = p.proveedor_id";

/// Maximum number of related products returned.
pub const RELATED_LIMIT: i64 = 8;

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, searched and ordered product listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM {PRODUCT_JOIN} WHERE TRUE"));

        for (column, value) in [
            ("p.categoria", &filter.categoria),
            ("p.marca", &filter.marca),
            ("p.procedencia", &filter.procedencia),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                qb.push(format!(" AND {column} ILIKE "))
                    .push_bind(like_pattern(value));
            }
        }

        for term in &filter.search_terms {
            let pattern = like_pattern(term);
            qb.push(" AND (p.nombre_producto ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.descripcion ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.categoria ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.marca ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY ").push(filter.ordering.sql());

        let products = qb.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM {PRODUCT_JOIN} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM {PRODUCT_JOIN} WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tienda.product WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Products flagged new or given a novelty date in the last 30 days.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn new_arrivals(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM {PRODUCT_JOIN}
            WHERE p.es_nuevo OR p.fecha_novedad >= NOW() - INTERVAL '30 days'
            ORDER BY p.fecha_novedad DESC NULLS LAST, p.fecha_registro DESC
            "
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Featured products, optionally narrowed by name or category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, nombre: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM {PRODUCT_JOIN} WHERE p.es_destacado"
        ));
        if let Some(nombre) = nombre.map(str::trim).filter(|n| !n.is_empty()) {
            let pattern = like_pattern(nombre);
            qb.push(" AND (p.nombre_producto ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.categoria ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY p.fecha_registro DESC");

        let products = qb.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok(products)
    }

    /// Newest products of the same category, excluding `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(
        &self,
        categoria: &str,
        exclude: Option<ProductId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM {PRODUCT_JOIN}
            WHERE LOWER(p.categoria) = LOWER($1)
              AND ($2::INTEGER IS NULL OR p.id <> $2)
            ORDER BY p.fecha_registro DESC
            LIMIT $3
            "
        ))
        .bind(categoria)
        .bind(exclude)
        .bind(RELATED_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Insert a product, deriving a unique slug from its name and code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` if the code is already used.
    pub async fn create(
        &self,
        fields: &NewProduct,
        imagen: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        let slug = self
            .free_slug(&product_slug(&fields.nombre_producto, &fields.codigo))
            .await?;

        sqlx::query_as::<_, Product>(&format!(
            r"
            WITH p AS (
                INSERT INTO tienda.product (
                    codigo, nombre_producto, descripcion, proveedor_id, marca, categoria,
                    procedencia, precio_unitario, precio_mayoreo, stock, es_nuevo,
                    fecha_novedad, es_destacado, imagen, slug
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    CASE WHEN $11 THEN COALESCE($12, NOW()) ELSE $12 END,
                    $13, $14, $15
                )
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p JOIN tienda.supplier s ON s.id = p.proveedor_id
            "
        ))
        .bind(&fields.codigo)
        .bind(&fields.nombre_producto)
        .bind(&fields.descripcion)
        .bind(fields.proveedor_id)
        .bind(&fields.marca)
        .bind(&fields.categoria)
        .bind(&fields.procedencia)
        .bind(fields.precio_unitario)
        .bind(fields.precio_mayoreo)
        .bind(fields.stock)
        .bind(fields.es_nuevo)
        .bind(fields.fecha_novedad)
        .bind(fields.es_destacado)
        .bind(imagen)
        .bind(&slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("product", e))
    }

    /// Overwrite the writable fields. The slug is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Duplicate` if the code clashes.
    pub async fn update(
        &self,
        id: ProductId,
        fields: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            WITH p AS (
                UPDATE tienda.product SET
                    codigo = $2, nombre_producto = $3, descripcion = $4, proveedor_id = $5,
                    marca = $6, categoria = $7, procedencia = $8, precio_unitario = $9,
                    precio_mayoreo = $10, stock = $11, es_nuevo = $12,
                    fecha_novedad = CASE WHEN $12 THEN COALESCE($13, NOW()) ELSE $13 END,
                    es_destacado = $14
                WHERE id = $1
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p JOIN tienda.supplier s ON s.id = p.proveedor_id
            "
        ))
        .bind(id)
        .bind(&fields.codigo)
        .bind(&fields.nombre_producto)
        .bind(&fields.descripcion)
        .bind(fields.proveedor_id)
        .bind(&fields.marca)
        .bind(&fields.categoria)
        .bind(&fields.procedencia)
        .bind(fields.precio_unitario)
        .bind(fields.precio_mayoreo)
        .bind(fields.stock)
        .bind(fields.es_nuevo)
        .bind(fields.fecha_novedad)
        .bind(fields.es_destacado)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error("product", e))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Point the product at a new image and return the previous path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn replace_image(
        &self,
        id: ProductId,
        imagen: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let previous: Option<Option<String>> = sqlx::query_scalar(
            r"
            WITH old AS (
                SELECT id, imagen FROM tienda.product WHERE id = $1 FOR UPDATE
            )
            UPDATE tienda.product p SET imagen = $2
            FROM old
            WHERE p.id = old.id
            RETURNING old.imagen
            ",
        )
        .bind(id)
        .bind(imagen)
        .fetch_optional(self.pool)
        .await?;

        previous.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product and return its image path so the file can be removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: ProductId) -> Result<Option<String>, RepositoryError> {
        let imagen: Option<Option<String>> =
            sqlx::query_scalar("DELETE FROM tienda.product WHERE id = $1 RETURNING imagen")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        imagen.ok_or(RepositoryError::NotFound)
    }

    async fn free_slug(&self, base: &str) -> Result<String, RepositoryError> {
        let taken: Vec<String> = sqlx::query_scalar(
            "SELECT slug FROM tienda.product WHERE slug = $1 OR slug LIKE $1 || '-%'",
        )
        .bind(base)
        .fetch_all(self.pool)
        .await?;

        Ok(unique_slug(base, |candidate| {
            taken.iter().any(|t| t == candidate)
        }))
    }
}
