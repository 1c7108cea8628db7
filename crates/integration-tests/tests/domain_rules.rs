//! Business rules played out as scenarios over the domain types, the way the
//! checkout service and auth flows apply them.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use davila_core::price::{PriceVisibility, Viewer, cart_total, checkout_unit_price};
use davila_core::verification::{
    CODE_TTL, CodeError, LoginGuard, ResendDecision, ResendState, check_code,
};
use davila_core::{MAX_STOCK, OrderStatus, StockMovement};
use rust_decimal::Decimal;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

/// Apply a status change to a single product line, as the checkout
/// service does inside its transaction.
fn advance(stock: i32, quantity: i32, from: OrderStatus, to: OrderStatus) -> i32 {
    match StockMovement::for_transition(from, to) {
        Some(movement) => movement.apply(stock, quantity).unwrap_or(stock),
        None => stock,
    }
}

#[test]
fn test_completing_then_cancelling_round_trips_stock() {
    let mut stock = 10;
    stock = advance(stock, 3, OrderStatus::Pending, OrderStatus::Accepted);
    assert_eq!(stock, 10);
    stock = advance(stock, 3, OrderStatus::Accepted, OrderStatus::Completed);
    assert_eq!(stock, 7);
    stock = advance(stock, 3, OrderStatus::Completed, OrderStatus::Cancelled);
    assert_eq!(stock, 10);
}

#[test]
fn test_processing_to_completed_deducts_once() {
    let mut stock = 5;
    stock = advance(stock, 2, OrderStatus::Pending, OrderStatus::Processing);
    stock = advance(stock, 2, OrderStatus::Processing, OrderStatus::Completed);
    assert_eq!(stock, 3);
}

#[test]
fn test_cancelling_a_pending_order_leaves_stock_alone() {
    assert_eq!(advance(4, 2, OrderStatus::Pending, OrderStatus::Cancelled), 4);
    assert_eq!(advance(4, 2, OrderStatus::Rejected, OrderStatus::Cancelled), 4);
}

#[test]
fn test_short_stock_line_is_skipped_not_negative() {
    assert_eq!(StockMovement::Deduct.apply(1, 2), None);
    assert_eq!(advance(1, 2, OrderStatus::Pending, OrderStatus::Completed), 1);
}

#[test]
fn test_restore_is_capped() {
    assert_eq!(StockMovement::Restore.apply(MAX_STOCK - 1, 5), Some(MAX_STOCK));
}

#[test]
fn test_customer_edit_and_delete_windows() {
    let editable: Vec<_> = OrderStatus::ALL
        .into_iter()
        .filter(|s| s.is_customer_editable())
        .collect();
    assert_eq!(editable, [OrderStatus::Pending, OrderStatus::Processing]);

    let deletable: Vec<_> = OrderStatus::ALL
        .into_iter()
        .filter(|s| s.is_customer_deletable())
        .collect();
    assert_eq!(deletable, [OrderStatus::Pending, OrderStatus::Cancelled]);
}

#[test]
fn test_verification_code_expires_after_ten_minutes() {
    let expires_at = Some(t0() + CODE_TTL);
    assert!(check_code(Some("482910"), expires_at, " 482910 ", t0() + TimeDelta::minutes(9)).is_ok());
    assert_eq!(
        check_code(Some("482910"), expires_at, "482910", t0() + TimeDelta::minutes(11)),
        Err(CodeError::Expired)
    );
    assert_eq!(
        check_code(Some("482910"), expires_at, "111111", t0()),
        Err(CodeError::Mismatch)
    );
}

#[test]
fn test_three_resends_per_hour() {
    let mut state = ResendState {
        resend_count: 0,
        last_resend_time: None,
    };
    let mut now = t0();
    for expected in 1..=3 {
        let ResendDecision::Allowed(next) = state.decide(now) else {
            panic!("resend {expected} should be allowed");
        };
        assert_eq!(next.resend_count, expected);
        state = next;
        now += TimeDelta::minutes(2);
    }

    assert_eq!(state.decide(now), ResendDecision::LimitReached);

    // The window restarts an hour after the last resend
    let later = state.last_resend_time.unwrap() + TimeDelta::hours(1);
    assert!(matches!(
        state.decide(later),
        ResendDecision::Allowed(ResendState { resend_count: 1, .. })
    ));
}

#[test]
fn test_lockout_after_three_failures() {
    let mut guard = LoginGuard::cleared();
    guard = guard.after_failure(t0());
    guard = guard.after_failure(t0());
    assert_eq!(guard.locked_for(t0()), None);

    guard = guard.after_failure(t0());
    assert_eq!(guard.locked_for(t0()), Some(TimeDelta::minutes(15)));
    assert_eq!(guard.locked_for(t0() + TimeDelta::minutes(16)), None);
}

#[test]
fn test_wholesale_buyer_pays_wholesale_price() {
    let wholesale_buyer = Viewer {
        is_staff: false,
        can_see_prices: false,
        can_see_wholesale: true,
    };
    let retail_buyer = Viewer::default();
    let unit = Decimal::new(12000, 2);
    let wholesale = Some(Decimal::new(9500, 2));

    assert_eq!(checkout_unit_price(&wholesale_buyer, unit, wholesale), Decimal::new(9500, 2));
    assert_eq!(checkout_unit_price(&wholesale_buyer, unit, None), unit);
    assert_eq!(checkout_unit_price(&retail_buyer, unit, wholesale), unit);

    let visibility = PriceVisibility::for_viewer(Some(&wholesale_buyer));
    assert!(visibility.wholesale && !visibility.unit);

    let total = cart_total(
        Some(&wholesale_buyer),
        [(2, unit, wholesale), (1, Decimal::new(3000, 2), None)],
    );
    assert_eq!(total, Some(Decimal::new(22000, 2)));
}
