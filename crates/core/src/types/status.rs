//! Status enums and the order lifecycle.

use serde::{Deserialize, Serialize};

/// Upper bound for a product's stock.
pub const MAX_STOCK: i32 = 1_000_000;

/// Lifecycle status of an order.
///
/// Customers place orders as `Pending`; staff move them through the other
/// states. Entering `Processing` or `Completed` takes the items out of
/// stock, and rejecting or cancelling an order that had already taken
/// stock puts it back (see [`StockMovement::for_transition`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tienda.order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Accepted,
        Self::Rejected,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label shown to customers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::Accepted => "Aceptado",
            Self::Rejected => "Rechazado",
            Self::Processing => "En proceso",
            Self::Completed => "Completado",
            Self::Cancelled => "Cancelado",
        }
    }

    /// Whether items of an order in this status are out of stock.
    #[must_use]
    pub const fn holds_stock(self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }

    /// Whether the customer may still edit the delivery details.
    #[must_use]
    pub const fn is_customer_editable(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether the customer may delete the order.
    #[must_use]
    pub const fn is_customer_deletable(self) -> bool {
        matches!(self, Self::Pending | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Stock adjustment caused by an order status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    /// Subtract each item's quantity from its product.
    Deduct,
    /// Give each item's quantity back to its product.
    Restore,
}

impl StockMovement {
    /// Stock movement for an order going from `prev` to `next`, if any.
    ///
    /// ```
    /// use davila_core::{OrderStatus, StockMovement};
    ///
    /// assert_eq!(
    ///     StockMovement::for_transition(OrderStatus::Pending, OrderStatus::Completed),
    ///     Some(StockMovement::Deduct),
    /// );
    /// assert_eq!(
    ///     StockMovement::for_transition(OrderStatus::Processing, OrderStatus::Completed),
    ///     None,
    /// );
    /// ```
    #[must_use]
    pub const fn for_transition(prev: OrderStatus, next: OrderStatus) -> Option<Self> {
        if next.holds_stock() && !prev.holds_stock() {
            Some(Self::Deduct)
        } else if matches!(next, OrderStatus::Rejected | OrderStatus::Cancelled)
            && prev.holds_stock()
        {
            Some(Self::Restore)
        } else {
            None
        }
    }

    /// New stock level for one item, or `None` when a deduction would go
    /// below zero. Restores saturate at [`MAX_STOCK`].
    #[must_use]
    pub fn apply(self, stock: i32, quantity: i32) -> Option<i32> {
        match self {
            Self::Deduct => (stock >= quantity).then(|| stock - quantity),
            Self::Restore => Some(stock.saturating_add(quantity).min(MAX_STOCK)),
        }
    }
}

/// Whether a supplier is local or imports its goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tienda.supplier_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum SupplierKind {
    #[default]
    Nacional,
    Internacional,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduct_when_entering_stock_holding_state() {
        for prev in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(
                StockMovement::for_transition(prev, OrderStatus::Completed),
                Some(StockMovement::Deduct)
            );
            assert_eq!(
                StockMovement::for_transition(prev, OrderStatus::Processing),
                Some(StockMovement::Deduct)
            );
        }
    }

    #[test]
    fn test_no_double_deduction_between_holding_states() {
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Processing, OrderStatus::Completed),
            None
        );
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Completed, OrderStatus::Processing),
            None
        );
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Completed, OrderStatus::Completed),
            None
        );
    }

    #[test]
    fn test_restore_when_cancelling_held_order() {
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Completed, OrderStatus::Cancelled),
            Some(StockMovement::Restore)
        );
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Processing, OrderStatus::Rejected),
            Some(StockMovement::Restore)
        );
    }

    #[test]
    fn test_cancelling_pending_order_leaves_stock() {
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Pending, OrderStatus::Cancelled),
            None
        );
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Accepted, OrderStatus::Rejected),
            None
        );
    }

    #[test]
    fn test_completed_back_to_pending_keeps_stock_out() {
        assert_eq!(
            StockMovement::for_transition(OrderStatus::Completed, OrderStatus::Pending),
            None
        );
    }

    #[test]
    fn test_apply_deduct_refuses_to_go_negative() {
        assert_eq!(StockMovement::Deduct.apply(10, 3), Some(7));
        assert_eq!(StockMovement::Deduct.apply(3, 3), Some(0));
        assert_eq!(StockMovement::Deduct.apply(2, 3), None);
    }

    #[test]
    fn test_apply_restore_is_capped() {
        assert_eq!(StockMovement::Restore.apply(5, 2), Some(7));
        assert_eq!(StockMovement::Restore.apply(MAX_STOCK - 1, 5), Some(MAX_STOCK));
    }

    #[test]
    fn test_customer_permissions() {
        assert!(OrderStatus::Pending.is_customer_editable());
        assert!(OrderStatus::Processing.is_customer_editable());
        assert!(!OrderStatus::Completed.is_customer_editable());
        assert!(OrderStatus::Pending.is_customer_deletable());
        assert!(OrderStatus::Cancelled.is_customer_deletable());
        assert!(!OrderStatus::Processing.is_customer_deletable());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
