//! Receiving pipeline tests
//!
//! Covers the three-stage state machine, the QC line arithmetic
//! (accepted + rejected == received, with the mismatch message naming the
//! offending quantities), QC result consistency, segregation of duties
//! across the stages, and day-scoped receiving numbers.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    actor_distinct_from, derive_receipt_status, validate_qc_line, validate_qc_result,
    weighted_average_cost, DocumentKind, LineReceipt, PurchaseOrderStatus, QcResult,
    ReceivingStatus,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_pipeline_happy_path() {
        use ReceivingStatus::*;
        assert!(Pending.can_transition(ProcVerified));
        assert!(ProcVerified.can_transition(QcApproved));
        assert!(QcApproved.can_transition(Received));
    }

    #[test]
    fn test_qc_rejection_is_terminal() {
        use ReceivingStatus::*;
        assert!(ProcVerified.can_transition(QcRejected));
        assert!(QcRejected.is_terminal());
        assert!(!QcRejected.can_transition(QcApproved));
        assert!(!QcRejected.can_transition(Received));
    }

    #[test]
    fn test_no_stage_skipping() {
        use ReceivingStatus::*;
        assert!(!Pending.can_transition(QcApproved));
        assert!(!Pending.can_transition(Received));
        assert!(!ProcVerified.can_transition(Received));
    }

    /// received=5, accepted=3, rejected=1 is rejected with a message naming
    /// all three quantities
    #[test]
    fn test_qc_mismatch_names_quantities() {
        let err = validate_qc_line(dec("5"), dec("3"), dec("1")).unwrap_err();
        assert_eq!(err, "Accepted (3) + Rejected (1) must equal Received (5)");
    }

    #[test]
    fn test_qc_line_balanced_split() {
        assert!(validate_qc_line(dec("5"), dec("3"), dec("2")).is_ok());
        assert!(validate_qc_line(dec("10"), dec("10"), dec("0")).is_ok());
        assert!(validate_qc_line(dec("10"), dec("0"), dec("10")).is_ok());
    }

    /// A result claiming acceptance with zero accepted units is rejected
    #[test]
    fn test_qc_result_requires_accepted_units() {
        assert!(validate_qc_result(QcResult::Accepted, Decimal::ZERO).is_err());
        assert!(validate_qc_result(QcResult::Partial, Decimal::ZERO).is_err());
        assert!(validate_qc_result(QcResult::Rejected, Decimal::ZERO).is_ok());

        assert!(validate_qc_result(QcResult::Accepted, dec("1")).is_ok());
        assert!(validate_qc_result(QcResult::Rejected, dec("1")).is_err());
    }

    /// Verifier, inspector and warehouse receiver must be pairwise distinct
    #[test]
    fn test_three_stage_segregation() {
        let verifier = Uuid::new_v4();
        let inspector = Uuid::new_v4();
        let receiver = Uuid::new_v4();

        assert!(actor_distinct_from(inspector, &[verifier]));
        assert!(actor_distinct_from(receiver, &[verifier, inspector]));

        // Any repeat is forbidden
        assert!(!actor_distinct_from(verifier, &[verifier]));
        assert!(!actor_distinct_from(verifier, &[verifier, inspector]));
        assert!(!actor_distinct_from(inspector, &[verifier, inspector]));
    }

    #[test]
    fn test_receiving_number_is_day_scoped() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        assert_eq!(
            DocumentKind::Receiving.format_number(jan, 1),
            "RCV-20240115-001"
        );
        // The sequence restarts per day; the same value on another day
        // yields a different number
        assert_eq!(
            DocumentKind::Receiving.format_number(feb, 1),
            "RCV-20240201-001"
        );
        assert_ne!(DocumentKind::Receiving.period(jan), DocumentKind::Receiving.period(feb));
    }

    /// End-to-end walk of the receipt arithmetic: order 10 @ 5, count 10,
    /// accept 8 / reject 2, book into an empty location
    #[test]
    fn test_partial_acceptance_arithmetic() {
        let ordered = dec("10");
        let unit_cost = dec("5");
        let counted = dec("10");
        let accepted = dec("8");
        let rejected = dec("2");

        assert!(validate_qc_line(counted, accepted, rejected).is_ok());
        assert!(validate_qc_result(QcResult::Partial, accepted).is_ok());

        // Only accepted units reach the ledger, at the order's unit cost
        let position_qty = accepted;
        let position_cost = weighted_average_cost(Decimal::ZERO, Decimal::ZERO, accepted, unit_cost);
        assert_eq!(position_qty, dec("8"));
        assert_eq!(position_cost, dec("5"));

        // The order is only partially received: 8 of 10
        let receipts = [LineReceipt {
            ordered,
            received: accepted,
        }];
        assert_eq!(
            derive_receipt_status(&receipts),
            Some(PurchaseOrderStatus::PartiallyReceived)
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any split of the received quantity passes; anything else fails
        #[test]
        fn prop_qc_split_must_balance(
            received in quantity_strategy(),
            accepted in quantity_strategy()
        ) {
            let accepted = accepted.min(received);
            let rejected = received - accepted;

            prop_assert!(validate_qc_line(received, accepted, rejected).is_ok());

            // Perturbing the rejected quantity breaks the balance
            let off = rejected + Decimal::new(1, 1);
            prop_assert!(validate_qc_line(received, accepted, off).is_err());
        }

        /// The mismatch error always names the three quantities involved
        #[test]
        fn prop_qc_error_names_quantities(
            received in quantity_strategy(),
            accepted in quantity_strategy(),
            rejected in quantity_strategy()
        ) {
            if accepted + rejected != received {
                let err = validate_qc_line(received, accepted, rejected).unwrap_err();
                prop_assert!(err.contains(&accepted.to_string()));
                prop_assert!(err.contains(&rejected.to_string()));
                prop_assert!(err.contains(&received.to_string()));
            }
        }

        /// An actor is distinct from a set exactly when not a member
        #[test]
        fn prop_actor_distinctness(repeat_prior in prop::bool::ANY) {
            let prior = [Uuid::new_v4(), Uuid::new_v4()];
            let actor = if repeat_prior { prior[1] } else { Uuid::new_v4() };

            prop_assert_eq!(actor_distinct_from(actor, &prior), !repeat_prior);
        }
    }
}
