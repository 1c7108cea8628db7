//! Price visibility and line pricing.
//!
//! Products carry a unit price and an optional wholesale price. Which of
//! the two a caller sees, and which one they pay, depends on who they are:
//!
//! | viewer                           | sees                 | pays                          |
//! |----------------------------------|----------------------|-------------------------------|
//! | staff                            | both                 | n/a                           |
//! | wholesale-permitted customer     | wholesale            | wholesale, unit when missing  |
//! | other customer, anonymous        | unit                 | unit                          |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The pricing-relevant facts about whoever is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewer {
    pub is_staff: bool,
    pub can_see_prices: bool,
    pub can_see_wholesale: bool,
}

/// Which product prices a viewer is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceVisibility {
    pub unit: bool,
    pub wholesale: bool,
}

impl PriceVisibility {
    /// Visibility for `viewer`; `None` means anonymous.
    #[must_use]
    pub const fn for_viewer(viewer: Option<&Viewer>) -> Self {
        match viewer {
            Some(v) if v.is_staff => Self {
                unit: true,
                wholesale: true,
            },
            Some(v) if v.can_see_wholesale => Self {
                unit: false,
                wholesale: true,
            },
            _ => Self {
                unit: true,
                wholesale: false,
            },
        }
    }

    /// Apply the visibility to a pair of prices.
    #[must_use]
    pub fn filter(
        self,
        unit: Decimal,
        wholesale: Option<Decimal>,
    ) -> (Option<Decimal>, Option<Decimal>) {
        (
            self.unit.then_some(unit),
            if self.wholesale { wholesale } else { None },
        )
    }
}

/// A wholesale price of zero means the product has none.
fn effective_wholesale(wholesale: Option<Decimal>) -> Option<Decimal> {
    wholesale.filter(|price| !price.is_zero())
}

/// Price charged per unit when `buyer` checks out a product.
#[must_use]
pub fn checkout_unit_price(buyer: &Viewer, unit: Decimal, wholesale: Option<Decimal>) -> Decimal {
    match effective_wholesale(wholesale) {
        Some(price) if buyer.can_see_wholesale => price,
        _ => unit,
    }
}

/// Cart line subtotal as displayed to `viewer`.
///
/// Anonymous callers see the unit subtotal; authenticated customers need
/// either the wholesale or the price-view permission, otherwise the value
/// is hidden.
#[must_use]
pub fn cart_line_subtotal(
    viewer: Option<&Viewer>,
    quantity: i32,
    unit: Decimal,
    wholesale: Option<Decimal>,
) -> Option<Decimal> {
    let qty = Decimal::from(quantity);
    let wholesale = effective_wholesale(wholesale);
    match viewer {
        Some(v) if v.can_see_wholesale && wholesale.is_some() => wholesale.map(|p| p * qty),
        None => Some(unit * qty),
        Some(v) if v.can_see_prices => Some(unit * qty),
        Some(_) => None,
    }
}

/// Cart total as displayed to `viewer`, given `(quantity, unit, wholesale)`
/// for every line. Follows the same permission rules as
/// [`cart_line_subtotal`], except that wholesale-permitted viewers fall back
/// to the unit price for products without a wholesale price.
#[must_use]
pub fn cart_total<I>(viewer: Option<&Viewer>, lines: I) -> Option<Decimal>
where
    I: IntoIterator<Item = (i32, Decimal, Option<Decimal>)>,
{
    let lines = lines.into_iter();
    match viewer {
        Some(v) if v.can_see_wholesale => Some(
            lines
                .map(|(qty, unit, wholesale)| {
                    Decimal::from(qty) * effective_wholesale(wholesale).unwrap_or(unit)
                })
                .sum(),
        ),
        Some(v) if !v.can_see_prices => None,
        _ => Some(lines.map(|(qty, unit, _)| Decimal::from(qty) * unit).sum()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(units: i64) -> Decimal {
        Decimal::from(units)
    }

    const STAFF: Viewer = Viewer {
        is_staff: true,
        can_see_prices: false,
        can_see_wholesale: false,
    };
    const WHOLESALE: Viewer = Viewer {
        is_staff: false,
        can_see_prices: false,
        can_see_wholesale: true,
    };
    const RETAIL: Viewer = Viewer {
        is_staff: false,
        can_see_prices: true,
        can_see_wholesale: false,
    };
    const PLAIN: Viewer = Viewer {
        is_staff: false,
        can_see_prices: false,
        can_see_wholesale: false,
    };

    #[test]
    fn test_visibility_per_viewer() {
        let staff = PriceVisibility::for_viewer(Some(&STAFF));
        assert!(staff.unit && staff.wholesale);

        let wholesale = PriceVisibility::for_viewer(Some(&WHOLESALE));
        assert!(!wholesale.unit && wholesale.wholesale);

        let retail = PriceVisibility::for_viewer(Some(&RETAIL));
        assert!(retail.unit && !retail.wholesale);

        let anon = PriceVisibility::for_viewer(None);
        assert!(anon.unit && !anon.wholesale);
    }

    #[test]
    fn test_filter_hides_prices() {
        let vis = PriceVisibility::for_viewer(Some(&WHOLESALE));
        assert_eq!(
            vis.filter(dec(10), Some(dec(8))),
            (None, Some(dec(8)))
        );
        let vis = PriceVisibility::for_viewer(None);
        assert_eq!(vis.filter(dec(10), Some(dec(8))), (Some(dec(10)), None));
    }

    #[test]
    fn test_checkout_price_prefers_wholesale_when_permitted() {
        assert_eq!(checkout_unit_price(&WHOLESALE, dec(10), Some(dec(7))), dec(7));
        assert_eq!(checkout_unit_price(&WHOLESALE, dec(10), None), dec(10));
        assert_eq!(checkout_unit_price(&RETAIL, dec(10), Some(dec(7))), dec(10));
        assert_eq!(checkout_unit_price(&STAFF, dec(10), Some(dec(7))), dec(10));
    }

    #[test]
    fn test_cart_line_subtotal() {
        assert_eq!(
            cart_line_subtotal(Some(&WHOLESALE), 3, dec(10), Some(dec(7))),
            Some(dec(21))
        );
        assert_eq!(
            cart_line_subtotal(Some(&RETAIL), 3, dec(10), Some(dec(7))),
            Some(dec(30))
        );
        assert_eq!(cart_line_subtotal(None, 2, dec(10), None), Some(dec(20)));
        assert_eq!(cart_line_subtotal(Some(&PLAIN), 2, dec(10), None), None);
        // Wholesale customer, product without a wholesale price, no retail permission
        assert_eq!(cart_line_subtotal(Some(&WHOLESALE), 2, dec(10), None), None);
    }

    #[test]
    fn test_cart_total() {
        let lines = [(2, dec(10), Some(dec(8))), (1, dec(5), None)];
        assert_eq!(cart_total(Some(&WHOLESALE), lines), Some(dec(21)));
        assert_eq!(cart_total(Some(&RETAIL), lines), Some(dec(25)));
        assert_eq!(cart_total(Some(&PLAIN), lines), None);
        assert_eq!(cart_total(None, lines), Some(dec(25)));
    }

    #[test]
    fn test_zero_wholesale_price_falls_back_to_unit() {
        let unit = Decimal::new(12000, 2);
        let zero = Some(Decimal::new(0, 2));
        assert_eq!(checkout_unit_price(&WHOLESALE, unit, zero), unit);
        // No retail permission, so a zero wholesale price leaves nothing to show
        assert_eq!(cart_line_subtotal(Some(&WHOLESALE), 2, unit, zero), None);
        assert_eq!(
            cart_total(Some(&WHOLESALE), [(2, unit, zero)]),
            Some(Decimal::new(24000, 2))
        );
    }
}
