//! Validation utilities for the F&B Supply Chain Platform
//!
//! Pure checks shared by every workflow: quantity sanity, QC line
//! arithmetic, segregation of duties, and the cost-basis arithmetic the
//! inventory ledger relies on.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::QcResult;

// ============================================================================
// Quantity and cost validations
// ============================================================================

/// Validate that a movement quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate that a unit cost is not negative
pub fn validate_unit_cost(unit_cost: Decimal) -> Result<(), &'static str> {
    if unit_cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    Ok(())
}

/// Weighted average cost of a position after an inbound movement.
///
/// With an empty position the incoming cost becomes the cost basis.
pub fn weighted_average_cost(
    current_qty: Decimal,
    current_cost: Decimal,
    added_qty: Decimal,
    added_cost: Decimal,
) -> Decimal {
    let total_qty = current_qty + added_qty;
    if total_qty <= Decimal::ZERO {
        return added_cost;
    }
    (current_qty * current_cost + added_qty * added_cost) / total_qty
}

// ============================================================================
// QC inspection arithmetic
// ============================================================================

/// Validate the accepted/rejected split of one receiving line.
///
/// The accepted and rejected quantities must account for exactly the
/// quantity counted on arrival.
pub fn validate_qc_line(
    received: Decimal,
    accepted: Decimal,
    rejected: Decimal,
) -> Result<(), String> {
    if accepted < Decimal::ZERO || rejected < Decimal::ZERO {
        return Err("Accepted and rejected quantities cannot be negative".to_string());
    }
    if accepted + rejected != received {
        return Err(format!(
            "Accepted ({}) + Rejected ({}) must equal Received ({})",
            accepted, rejected, received
        ));
    }
    Ok(())
}

/// Validate that the overall QC result is consistent with the accepted total
pub fn validate_qc_result(result: QcResult, total_accepted: Decimal) -> Result<(), &'static str> {
    match result {
        QcResult::Accepted | QcResult::Partial if total_accepted <= Decimal::ZERO => {
            Err("QC result claims acceptance but no units were accepted; use rejected instead")
        }
        QcResult::Rejected if total_accepted > Decimal::ZERO => {
            Err("QC result rejected cannot carry accepted units; use partial instead")
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Segregation of duties
// ============================================================================

/// Whether an actor is distinct from every actor that performed a prior
/// stage of the same workflow instance.
///
/// Single predicate used at every stage boundary that requires a different
/// pair of hands.
pub fn actor_distinct_from(actor: Uuid, prior_actors: &[Uuid]) -> bool {
    !prior_actors.contains(&actor)
}

// ============================================================================
// Approval gating
// ============================================================================

/// Whether a transfer value requires explicit approval. The boundary is
/// not-exceeding: a value equal to the threshold is auto-approved.
pub fn requires_approval(estimated_value: Decimal, threshold: Decimal) -> bool {
    estimated_value > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Quantity and cost tests
    // ========================================================================

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(dec("0.1")).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec("-5")).is_err());
    }

    #[test]
    fn test_unit_cost() {
        assert!(validate_unit_cost(Decimal::ZERO).is_ok());
        assert!(validate_unit_cost(dec("12.50")).is_ok());
        assert!(validate_unit_cost(dec("-0.01")).is_err());
    }

    #[test]
    fn test_weighted_average_exact() {
        // (10 * 5 + 10 * 15) / 20 = 10
        let cost = weighted_average_cost(dec("10"), dec("5"), dec("10"), dec("15"));
        assert_eq!(cost, dec("10"));
    }

    #[test]
    fn test_weighted_average_empty_position() {
        let cost = weighted_average_cost(Decimal::ZERO, Decimal::ZERO, dec("4"), dec("7.25"));
        assert_eq!(cost, dec("7.25"));
    }

    #[test]
    fn test_weighted_average_uneven() {
        // (30 * 2 + 10 * 6) / 40 = 3
        let cost = weighted_average_cost(dec("30"), dec("2"), dec("10"), dec("6"));
        assert_eq!(cost, dec("3"));
    }

    // ========================================================================
    // QC arithmetic tests
    // ========================================================================

    #[test]
    fn test_qc_line_balanced() {
        assert!(validate_qc_line(dec("5"), dec("3"), dec("2")).is_ok());
        assert!(validate_qc_line(dec("5"), dec("5"), dec("0")).is_ok());
        assert!(validate_qc_line(dec("5"), dec("0"), dec("5")).is_ok());
    }

    #[test]
    fn test_qc_line_mismatch_names_quantities() {
        let err = validate_qc_line(dec("5"), dec("3"), dec("1")).unwrap_err();
        assert_eq!(err, "Accepted (3) + Rejected (1) must equal Received (5)");
    }

    #[test]
    fn test_qc_line_negative() {
        assert!(validate_qc_line(dec("5"), dec("-1"), dec("6")).is_err());
        assert!(validate_qc_line(dec("5"), dec("6"), dec("-1")).is_err());
    }

    #[test]
    fn test_qc_result_consistency() {
        assert!(validate_qc_result(QcResult::Accepted, dec("5")).is_ok());
        assert!(validate_qc_result(QcResult::Partial, dec("3")).is_ok());
        assert!(validate_qc_result(QcResult::Rejected, Decimal::ZERO).is_ok());

        assert!(validate_qc_result(QcResult::Accepted, Decimal::ZERO).is_err());
        assert!(validate_qc_result(QcResult::Partial, Decimal::ZERO).is_err());
        assert!(validate_qc_result(QcResult::Rejected, dec("1")).is_err());
    }

    // ========================================================================
    // Segregation of duties tests
    // ========================================================================

    #[test]
    fn test_actor_distinct() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert!(actor_distinct_from(a, &[]));
        assert!(actor_distinct_from(a, &[b, c]));
        assert!(!actor_distinct_from(a, &[a]));
        assert!(!actor_distinct_from(a, &[b, a, c]));
    }

    // ========================================================================
    // Approval threshold tests
    // ========================================================================

    #[test]
    fn test_threshold_boundary() {
        let threshold = dec("1000.00");
        assert!(!requires_approval(dec("1000.00"), threshold));
        assert!(requires_approval(dec("1000.01"), threshold));
        assert!(!requires_approval(dec("999.99"), threshold));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any exact split of the received quantity balances
        #[test]
        fn prop_qc_split_balances(received in quantity_strategy(), accepted in quantity_strategy()) {
            let accepted = accepted.min(received);
            prop_assert!(validate_qc_line(received, accepted, received - accepted).is_ok());
        }

        /// The weighted average of two batches lies between their costs
        #[test]
        fn prop_weighted_average_bounded(
            old_qty in quantity_strategy(),
            old_cost in quantity_strategy(),
            add_qty in quantity_strategy(),
            add_cost in quantity_strategy()
        ) {
            let avg = weighted_average_cost(old_qty, old_cost, add_qty, add_cost);
            prop_assert!(avg >= old_cost.min(add_cost));
            prop_assert!(avg <= old_cost.max(add_cost));
        }
    }
}
