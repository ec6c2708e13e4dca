//! Inventory ledger tests
//!
//! Covers the core ledger properties:
//! - weighted average cost correctness
//! - conservation (signed transaction sum reconstructs the position)
//! - non-negativity (no operation sequence drives a position below zero)

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{signed_quantity, weighted_average_cost, TransactionDirection};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory stand-in for one inventory position, applying movements with
/// the same arithmetic and guards as the ledger service
#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    quantity: Decimal,
    average_cost: Decimal,
}

impl Position {
    fn empty() -> Self {
        Self {
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
        }
    }

    fn increase(&mut self, qty: Decimal, unit_cost: Decimal) {
        self.average_cost = weighted_average_cost(self.quantity, self.average_cost, qty, unit_cost);
        self.quantity += qty;
    }

    fn decrease(&mut self, qty: Decimal) -> Result<(), &'static str> {
        if qty > self.quantity {
            return Err("Insufficient stock");
        }
        self.quantity -= qty;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Weighted average cost: (10 x 5 + 10 x 15) / 20 = 10 exactly
    #[test]
    fn test_weighted_average_cost_exact() {
        let mut position = Position {
            quantity: dec("10"),
            average_cost: dec("5"),
        };
        position.increase(dec("10"), dec("15"));

        assert_eq!(position.quantity, dec("20"));
        assert_eq!(position.average_cost, dec("10"));
    }

    /// First inbound movement sets the cost basis
    #[test]
    fn test_first_inbound_sets_cost() {
        let mut position = Position::empty();
        position.increase(dec("4"), dec("7.25"));

        assert_eq!(position.quantity, dec("4"));
        assert_eq!(position.average_cost, dec("7.25"));
    }

    /// Decrease leaves the average cost unchanged
    #[test]
    fn test_decrease_keeps_average_cost() {
        let mut position = Position {
            quantity: dec("20"),
            average_cost: dec("10"),
        };
        position.decrease(dec("12")).unwrap();

        assert_eq!(position.quantity, dec("8"));
        assert_eq!(position.average_cost, dec("10"));
    }

    /// A decrease past the available quantity fails and changes nothing
    #[test]
    fn test_overdraft_fails_and_leaves_quantity() {
        let mut position = Position {
            quantity: dec("6"),
            average_cost: dec("3"),
        };
        let before = position;

        assert!(position.decrease(dec("10")).is_err());
        assert_eq!(position, before);
    }

    /// Draining a position to zero is allowed
    #[test]
    fn test_decrease_to_zero() {
        let mut position = Position {
            quantity: dec("5"),
            average_cost: dec("2"),
        };
        position.decrease(dec("5")).unwrap();
        assert_eq!(position.quantity, Decimal::ZERO);
    }

    /// Signed transaction quantities reconstruct the position
    #[test]
    fn test_conservation_over_history() {
        let history = [
            (TransactionDirection::In, dec("50")),
            (TransactionDirection::In, dec("30")),
            (TransactionDirection::Out, dec("20")),
            (TransactionDirection::In, dec("10")),
            (TransactionDirection::Out, dec("15")),
        ];

        let mut position = Position::empty();
        for (direction, qty) in history {
            match direction {
                TransactionDirection::In => position.increase(qty, dec("1")),
                TransactionDirection::Out => position.decrease(qty).unwrap(),
            }
        }

        let reconstructed: Decimal = history
            .iter()
            .map(|(direction, qty)| signed_quantity(*direction, *qty))
            .sum();

        // 50 + 30 - 20 + 10 - 15 = 55
        assert_eq!(reconstructed, dec("55"));
        assert_eq!(position.quantity, reconstructed);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    /// Strategy for generating valid unit costs
    fn cost_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=100000i64).prop_map(|n| Decimal::new(n, 2)) // 0.00 to 1000.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The weighted average after an inbound movement is bounded by the
        /// old and incoming unit costs
        #[test]
        fn prop_weighted_average_bounded(
            old_qty in quantity_strategy(),
            old_cost in cost_strategy(),
            add_qty in quantity_strategy(),
            add_cost in cost_strategy()
        ) {
            let avg = weighted_average_cost(old_qty, old_cost, add_qty, add_cost);
            let lo = old_cost.min(add_cost);
            let hi = old_cost.max(add_cost);

            prop_assert!(avg >= lo);
            prop_assert!(avg <= hi);
        }

        /// Conservation: after any sequence of movements the position
        /// quantity equals the signed sum of applied transactions
        #[test]
        fn prop_conservation(
            movements in prop::collection::vec(
                (prop::bool::ANY, quantity_strategy(), cost_strategy()),
                1..30
            )
        ) {
            let mut position = Position::empty();
            let mut signed_sum = Decimal::ZERO;

            for (inbound, qty, cost) in movements {
                if inbound {
                    position.increase(qty, cost);
                    signed_sum += signed_quantity(TransactionDirection::In, qty);
                } else if position.decrease(qty).is_ok() {
                    // Failed decreases append no transaction
                    signed_sum += signed_quantity(TransactionDirection::Out, qty);
                }
            }

            prop_assert_eq!(position.quantity, signed_sum);
        }

        /// Non-negativity: no movement sequence drives the quantity below
        /// zero
        #[test]
        fn prop_non_negativity(
            movements in prop::collection::vec(
                (prop::bool::ANY, quantity_strategy(), cost_strategy()),
                1..30
            )
        ) {
            let mut position = Position::empty();

            for (inbound, qty, cost) in movements {
                if inbound {
                    position.increase(qty, cost);
                } else {
                    let before = position.quantity;
                    if position.decrease(qty).is_err() {
                        prop_assert_eq!(position.quantity, before);
                    }
                }
                prop_assert!(position.quantity >= Decimal::ZERO);
            }
        }

        /// A full withdrawal leaves exactly zero
        #[test]
        fn prop_full_withdrawal_zero(qty in quantity_strategy(), cost in cost_strategy()) {
            let mut position = Position::empty();
            position.increase(qty, cost);
            position.decrease(qty).unwrap();

            prop_assert_eq!(position.quantity, Decimal::ZERO);
        }
    }
}
