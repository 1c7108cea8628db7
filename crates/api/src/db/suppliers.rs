//! Supplier repository.

use sqlx::PgPool;

use davila_core::{Email, SupplierId, SupplierKind};

use super::{RepositoryError, map_write_error};
use crate::models::supplier::Supplier;

const SUPPLIER_COLUMNS: &str = r"
    id, nombre_empresa, nombre_contacto, telefono, correo, direccion,
    ruc_documento, tipo_proveedor, marcas, categorias, fecha_registro
";

/// Full set of writable supplier fields.
#[derive(Debug, Clone)]
pub struct SupplierFields {
    pub nombre_empresa: String,
    pub nombre_contacto: String,
    pub telefono: String,
    pub correo: Email,
    pub direccion: String,
    pub ruc_documento: String,
    pub tipo_proveedor: SupplierKind,
    pub marcas: String,
    pub categorias: String,
}

pub struct SupplierRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SupplierRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All suppliers ordered by company name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM tienda.supplier ORDER BY nombre_empresa"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(suppliers)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM tienda.supplier WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(supplier)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` naming the field whose value is
    /// already used by another supplier.
    pub async fn create(&self, fields: &SupplierFields) -> Result<Supplier, RepositoryError> {
        sqlx::query_as::<_, Supplier>(&format!(
            r"
            INSERT INTO tienda.supplier (
                nombre_empresa, nombre_contacto, telefono, correo, direccion,
                ruc_documento, tipo_proveedor, marcas, categorias
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SUPPLIER_COLUMNS}
            "
        ))
        .bind(&fields.nombre_empresa)
        .bind(&fields.nombre_contacto)
        .bind(&fields.telefono)
        .bind(&fields.correo)
        .bind(&fields.direccion)
        .bind(&fields.ruc_documento)
        .bind(fields.tipo_proveedor)
        .bind(&fields.marcas)
        .bind(&fields.categorias)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error("supplier", e))
    }

    /// Overwrite every writable field.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Duplicate` on a unique field clash.
    pub async fn update(
        &self,
        id: SupplierId,
        fields: &SupplierFields,
    ) -> Result<Supplier, RepositoryError> {
        sqlx::query_as::<_, Supplier>(&format!(
            r"
            UPDATE tienda.supplier SET
                nombre_empresa = $2, nombre_contacto = $3, telefono = $4, correo = $5,
                direccion = $6, ruc_documento = $7, tipo_proveedor = $8,
                marcas = $9, categorias = $10
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&fields.nombre_empresa)
        .bind(&fields.nombre_contacto)
        .bind(&fields.telefono)
        .bind(&fields.correo)
        .bind(&fields.direccion)
        .bind(&fields.ruc_documento)
        .bind(fields.tipo_proveedor)
        .bind(&fields.marcas)
        .bind(&fields.categorias)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error("supplier", e))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a supplier that no product references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InUse` while products still point at it and
    /// `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: SupplierId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tienda.supplier WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error("supplier", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
