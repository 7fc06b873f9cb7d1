//! The stock rule: quantity on hand never goes below zero.

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ProductId};

/// Stock of a product as committed by a successful adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub stock: i64,
    pub revision: u64,
}

/// Decide the new quantity on hand for a signed `delta`.
///
/// Positive deltas restock, negative deltas consume, zero leaves the stock
/// as it is.
pub fn apply_delta(available: i64, delta: i64) -> DomainResult<i64> {
    let next = available
        .checked_add(delta)
        .ok_or_else(|| DomainError::validation("stock adjustment overflows"))?;

    if next < 0 {
        return Err(DomainError::insufficient_stock(available, delta));
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decrease_within_stock_is_applied() {
        assert_eq!(apply_delta(10, -3).unwrap(), 7);
        assert_eq!(apply_delta(7, -7).unwrap(), 0);
    }

    #[test]
    fn decrease_below_zero_is_rejected() {
        match apply_delta(7, -10) {
            Err(DomainError::InsufficientStock {
                available,
                requested,
            }) => {
                assert_eq!(available, 7);
                assert_eq!(requested, -10);
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn zero_delta_keeps_stock() {
        assert_eq!(apply_delta(5, 0).unwrap(), 5);
        assert_eq!(apply_delta(0, 0).unwrap(), 0);
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(matches!(apply_delta(i64::MAX, 1), Err(DomainError::Validation(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: folding any sequence of deltas through the rule never
        /// yields negative stock, and the final stock equals the initial stock
        /// plus the sum of the deltas that were accepted.
        #[test]
        fn stock_equals_initial_plus_applied_deltas(
            initial in 0i64..1_000,
            deltas in prop::collection::vec(-50i64..50, 0..64),
        ) {
            let mut stock = initial;
            let mut applied = 0i64;

            for delta in deltas {
                match apply_delta(stock, delta) {
                    Ok(next) => {
                        applied += delta;
                        stock = next;
                    }
                    Err(DomainError::InsufficientStock { available, .. }) => {
                        prop_assert_eq!(available, stock);
                        prop_assert!(stock + delta < 0);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
                prop_assert!(stock >= 0);
            }

            prop_assert_eq!(stock, initial + applied);
        }
    }
}
