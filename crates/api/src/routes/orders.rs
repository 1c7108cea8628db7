//! Customer order handlers: checkout, history and self-service edits.

use std::slice;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use davila_core::{CartId, OrderId};

use crate::db::OrderRepository;
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::RequireAuth;
use crate::models::order::{Order, OrderResponse, ShippingDetails, ShippingUpdate};
use crate::models::user::User;
use crate::routes::extract::ValidJson;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

pub(crate) const ORDER_NOT_FOUND: &str = "Orden no encontrada.";
const DEFAULT_COUNTRY: &str = "Perú";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(required)]
    pub cart_id: Option<CartId>,
    #[validate(required, length(min = 1, max = 20))]
    pub dni: Option<String>,
    #[validate(required, length(min = 1, max = 20))]
    pub phone: Option<String>,
    #[validate(required, length(min = 1, max = 255))]
    pub address: Option<String>,
    #[validate(required, length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(required, length(min = 1, max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    pub notes: Option<String>,
    pub shipping: Option<Decimal>,
}

impl CreateOrderRequest {
    fn shipping_cost(&self) -> Result<Decimal> {
        let shipping = self.shipping.unwrap_or(Decimal::ZERO);
        if shipping.is_sign_negative() && !shipping.is_zero() {
            return Err(AppError::Validation(FieldErrors::single(
                "shipping",
                "Asegúrese de que este valor sea mayor o igual a 0.",
            )));
        }
        Ok(shipping.round_dp(2))
    }

    fn into_details(self) -> ShippingDetails {
        ShippingDetails {
            dni: self.dni.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            state: self.state.unwrap_or_default(),
            country: self
                .country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Contact fields a customer may change on their own order.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 20))]
    pub dni: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
    pub notes: Option<String>,
}

impl From<UpdateOrderRequest> for ShippingUpdate {
    fn from(body: UpdateOrderRequest) -> Self {
        Self {
            dni: body.dni,
            phone: body.phone,
            address: body.address,
            city: body.city,
            state: body.state,
            country: body.country,
            notes: body.notes,
        }
    }
}

/// Render one order with its items.
pub(crate) async fn render_order(state: &AppState, order: Order) -> Result<OrderResponse> {
    let items = OrderRepository::new(state.pool())
        .items_for(slice::from_ref(&order))
        .await?;
    Ok(OrderResponse::render(order, &items, state.config()))
}

pub(crate) async fn render_orders(
    state: &AppState,
    orders: Vec<Order>,
) -> Result<Vec<OrderResponse>> {
    let items = OrderRepository::new(state.pool()).items_for(&orders).await?;
    Ok(OrderResponse::render_all(orders, &items, state.config()))
}

async fn own_order(state: &AppState, id: OrderId, user: &User) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id, Some(user.id))
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))
}

/// The caller's orders, newest first.
pub async fn list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(render_orders(&state, orders).await?))
}

/// Turn the caller's active cart into an order.
#[tracing::instrument(skip_all)]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    let shipping = body.shipping_cost()?;
    let Some(cart_id) = body.cart_id else {
        return Err(AppError::Validation(FieldErrors::single(
            "cart_id",
            "Este campo es requerido.",
        )));
    };
    let details = body.into_details();

    let order_id = CheckoutService::new(state.pool())
        .place_order(&user, cart_id, &details, shipping)
        .await?;

    let order = own_order(&state, order_id, &user).await?;
    Ok((StatusCode::CREATED, Json(render_order(&state, order).await?)))
}

pub async fn detail(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = own_order(&state, id, &user).await?;
    Ok(Json(render_order(&state, order).await?))
}

/// Edit delivery details while the order is still pending or processing.
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    ValidJson(body): ValidJson<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>> {
    let order = own_order(&state, id, &user).await?;
    if !order.status.is_customer_editable() {
        return Err(AppError::Forbidden(
            "No se puede modificar una orden completada o cancelada.".to_string(),
        ));
    }

    let repo = OrderRepository::new(state.pool());
    repo.update_shipping(id, &ShippingUpdate::from(body)).await?;
    tracing::info!(user_id = %user.id, order_id = %id, "Order contact details updated");

    let order = own_order(&state, id, &user).await?;
    Ok(Json(render_order(&state, order).await?))
}

/// Delete a pending or cancelled order.
pub async fn delete(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    let order = own_order(&state, id, &user).await?;
    if !order.status.is_customer_deletable() {
        return Err(AppError::Forbidden(
            "Solo se pueden eliminar órdenes pendientes o canceladas.".to_string(),
        ));
    }

    OrderRepository::new(state.pool()).delete(id).await?;
    tracing::info!(user_id = %user.id, order_id = %id, "Order deleted by customer");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_body(json: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_create_defaults_country_and_shipping() {
        let body = create_body(serde_json::json!({
            "cart_id": 7,
            "dni": "45678912",
            "phone": "987654321",
            "address": "Jr. Junín 450",
            "city": "Huancayo",
            "state": "Junín",
            "notes": "  "
        }));
        assert!(body.validate().is_ok());
        assert_eq!(body.shipping_cost().unwrap(), Decimal::ZERO);

        let details = body.into_details();
        assert_eq!(details.country, "Perú");
        assert_eq!(details.notes, None);
    }

    #[test]
    fn test_create_requires_contact_fields() {
        let body = create_body(serde_json::json!({ "cart_id": 7 }));
        let errors: FieldErrors = body.validate().unwrap_err().into();
        for field in ["dni", "phone", "address", "city", "state"] {
            assert_eq!(errors.get(field).unwrap()[0], "Este campo es requerido.");
        }
    }

    #[test]
    fn test_shipping_accepts_strings_and_rejects_negative() {
        let body = create_body(serde_json::json!({ "shipping": "15.50" }));
        assert_eq!(body.shipping_cost().unwrap(), Decimal::new(1550, 2));

        let body = create_body(serde_json::json!({ "shipping": -3 }));
        assert!(matches!(body.shipping_cost(), Err(AppError::Validation(_))));
    }
}
