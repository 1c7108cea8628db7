//! Monthly sales statistics for the admin dashboard.

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SupplierSales {
    pub proveedor: String,
    pub ventas: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub ganancias: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategorySales {
    pub categoria: String,
    pub ventas: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub ganancias: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSales {
    pub producto: String,
    pub ventas: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MonthTotals {
    pub ventas: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub ganancias: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierStats {
    pub sales_data: Vec<SupplierSales>,
    pub categorias_data: Vec<CategorySales>,
    pub productos_data: Vec<ProductSales>,
    pub totales_mes: MonthTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_serialize_with_camel_case_keys_and_float_earnings() {
        let stats = SupplierStats {
            sales_data: vec![SupplierSales {
                proveedor: "Motores SAC".to_string(),
                ventas: 3,
                ganancias: Decimal::new(15_050, 2),
            }],
            categorias_data: vec![],
            productos_data: vec![],
            totales_mes: MonthTotals {
                ventas: 3,
                ganancias: Decimal::new(15_050, 2),
            },
        };
        let json = serde_json::to_value(&stats).unwrap_or_default();
        assert_eq!(json["salesData"][0]["ganancias"], serde_json::json!(150.5));
        assert_eq!(json["totalesMes"]["ventas"], 3);
        assert!(json.get("categoriasData").is_some());
        assert!(json.get("productosData").is_some());
    }
}
