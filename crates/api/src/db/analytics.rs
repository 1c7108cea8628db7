//! Sales aggregates over completed orders of the current calendar month.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::analytics::{
    CategorySales, MonthTotals, ProductSales, SupplierSales, SupplierStats,
};

const MONTH_ITEMS: &str = r"
    FROM tienda.order_item oi
    JOIN tienda.order o ON o.id = oi.order_id
    WHERE o.status = 'completed'
      AND o.created_at >= $1
";

/// Midnight UTC on the first day of the month containing `now`.
#[must_use]
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Rankings by supplier, category and product plus monthly totals.
    ///
    /// Lines whose product has since been deleted count towards the totals
    /// only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn supplier_stats(&self) -> Result<SupplierStats, RepositoryError> {
        let since = month_start(Utc::now());

        let sales_data = sqlx::query_as::<_, SupplierSales>(&format!(
            r"
            SELECT s.nombre_empresa AS proveedor,
                   SUM(oi.cantidad)::BIGINT AS ventas,
                   SUM(oi.subtotal) AS ganancias
            FROM (SELECT oi.* {MONTH_ITEMS}) oi
            JOIN tienda.product p ON p.id = oi.product_id
            JOIN tienda.supplier s ON s.id = p.proveedor_id
            GROUP BY s.nombre_empresa
            ORDER BY ventas DESC, proveedor
            "
        ))
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        let categorias_data = sqlx::query_as::<_, CategorySales>(&format!(
            r"
            SELECT p.categoria,
                   SUM(oi.cantidad)::BIGINT AS ventas,
                   SUM(oi.subtotal) AS ganancias
            FROM (SELECT oi.* {MONTH_ITEMS}) oi
            JOIN tienda.product p ON p.id = oi.product_id
            GROUP BY p.categoria
            ORDER BY ventas DESC, p.categoria
            "
        ))
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        let productos_data = sqlx::query_as::<_, ProductSales>(&format!(
            r"
            SELECT p.nombre_producto AS producto,
                   SUM(oi.cantidad)::BIGINT AS ventas
            FROM (SELECT oi.* {MONTH_ITEMS}) oi
            JOIN tienda.product p ON p.id = oi.product_id
            GROUP BY p.nombre_producto
            ORDER BY ventas DESC, producto
            "
        ))
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        let totales_mes = sqlx::query_as::<_, MonthTotals>(&format!(
            r"
            SELECT COALESCE(SUM(oi.cantidad), 0)::BIGINT AS ventas,
                   COALESCE(SUM(oi.subtotal), 0) AS ganancias
            {MONTH_ITEMS}
            "
        ))
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(SupplierStats {
            sales_data,
            categorias_data,
            productos_data,
            totales_mes,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_month_start_is_utc_midnight_on_day_one() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 4, 59, 59).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()
        );
    }
}
