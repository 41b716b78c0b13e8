//! Pricing calculator: the single source of truth for order totals.
//!
//! Pure arithmetic over unit prices and quantities; tax and shipping are
//! policy values supplied by the caller, never derived here.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Totals {
    pub items_price: i64,
    pub tax_price: i64,
    pub shipping_charges: i64,
    pub total_amount: i64,
}

/// Compute authoritative totals for a cart of `(unit_price, quantity)` pairs.
///
/// Rejects any quantity <= 0 or any negative amount. Deterministic and
/// side-effect free.
pub fn compute_totals(
    items: &[(i64, i32)],
    tax_price: i64,
    shipping_charges: i64,
) -> Result<Totals, AppError> {
    if items.is_empty() {
        return Err(AppError::Validation("order has no line items".into()));
    }
    if tax_price < 0 || shipping_charges < 0 {
        return Err(AppError::Validation(
            "tax and shipping charges must be non-negative".into(),
        ));
    }

    let mut items_price: i64 = 0;
    for &(price, quantity) in items {
        if quantity <= 0 {
            return Err(AppError::Validation(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }
        if price < 0 {
            return Err(AppError::Validation(format!(
                "unit price must be non-negative, got {price}"
            )));
        }
        items_price += price * i64::from(quantity);
    }

    Ok(Totals {
        items_price,
        tax_price,
        shipping_charges,
        total_amount: items_price + tax_price + shipping_charges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_sum_of_components() {
        let totals = compute_totals(&[(100, 2), (250, 1)], 35, 20).unwrap();
        assert_eq!(totals.items_price, 450);
        assert_eq!(
            totals.total_amount,
            totals.items_price + totals.tax_price + totals.shipping_charges
        );
    }

    #[test]
    fn two_units_plus_tax_and_shipping() {
        // one line item: price 100, qty 2; tax 10; shipping 5
        let totals = compute_totals(&[(100, 2)], 10, 5).unwrap();
        assert_eq!(totals.items_price, 200);
        assert_eq!(totals.total_amount, 215);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(compute_totals(&[(100, 0)], 0, 0).is_err());
        assert!(compute_totals(&[(100, -3)], 0, 0).is_err());
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(compute_totals(&[(-1, 1)], 0, 0).is_err());
        assert!(compute_totals(&[(100, 1)], -1, 0).is_err());
        assert!(compute_totals(&[(100, 1)], 0, -1).is_err());
    }

    #[test]
    fn rejects_empty_cart() {
        assert!(compute_totals(&[], 0, 0).is_err());
    }
}
