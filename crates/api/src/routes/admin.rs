//! Staff-only order management and sales statistics.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use davila_core::{OrderId, OrderStatus};

use crate::db::{AnalyticsRepository, OrderRepository, RepositoryError};
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::RequireAdmin;
use crate::models::analytics::SupplierStats;
use crate::models::order::OrderResponse;
use crate::routes::extract::ValidJson;
use crate::routes::orders::{ORDER_NOT_FOUND, render_order, render_orders};
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct StatusRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl StatusRequest {
    fn parsed_status(&self) -> Result<Option<OrderStatus>> {
        self.status
            .as_deref()
            .map(|raw| {
                raw.parse::<OrderStatus>().map_err(|_| {
                    AppError::Validation(FieldErrors::single(
                        "status",
                        format!("\"{raw}\" no es una elección válida."),
                    ))
                })
            })
            .transpose()
    }
}

/// Every order, newest first.
pub async fn list_orders(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(render_orders(&state, orders).await?))
}

pub async fn order_detail(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = OrderRepository::new(state.pool())
        .get(id, None)
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))?;
    Ok(Json(render_order(&state, order).await?))
}

/// Change an order's status, moving stock as the transition requires.
#[tracing::instrument(skip_all)]
pub async fn update_order(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    ValidJson(body): ValidJson<StatusRequest>,
) -> Result<impl IntoResponse> {
    let status = body.parsed_status()?;
    let change = CheckoutService::new(state.pool())
        .change_status(id, status, body.notes.as_deref())
        .await?;

    tracing::info!(
        admin_id = %admin.id,
        order_id = %id,
        from = %change.previous,
        to = %change.current,
        movement = ?change.movement,
        "Order status changed by admin"
    );

    Ok(Json(json!({
        "detail": format!(
            "Estado de la orden actualizado correctamente a '{}'.",
            change.current.as_str()
        ),
        "order_id": id,
        "new_status": change.current,
    })))
}

pub async fn delete_order(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    OrderRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(ORDER_NOT_FOUND.to_string()),
            other => other.into(),
        })?;
    tracing::info!(admin_id = %admin.id, order_id = %id, "Order deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// Sales of completed orders in the current month.
pub async fn supplier_stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<SupplierStats>> {
    let stats = AnalyticsRepository::new(state.pool()).supplier_stats().await?;
    Ok(Json(stats))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let body = StatusRequest {
            status: Some("completed".to_string()),
            notes: None,
        };
        assert_eq!(body.parsed_status().unwrap(), Some(OrderStatus::Completed));

        let body = StatusRequest {
            status: None,
            notes: Some("Entregado".to_string()),
        };
        assert_eq!(body.parsed_status().unwrap(), None);

        let body = StatusRequest {
            status: Some("shipped".to_string()),
            notes: None,
        };
        let Err(AppError::Validation(errors)) = body.parsed_status() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("status").unwrap()[0], "\"shipped\" no es una elección válida.");
    }
}
