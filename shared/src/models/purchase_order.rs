//! Purchase order lifecycle models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status of a purchase order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    PendingApproval,
    Approved,
    Sent,
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::PendingApproval => "pending_approval",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::PartiallyReceived => "partially_received",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PurchaseOrderStatus::Draft),
            "pending_approval" => Some(PurchaseOrderStatus::PendingApproval),
            "approved" => Some(PurchaseOrderStatus::Approved),
            "sent" => Some(PurchaseOrderStatus::Sent),
            "partially_received" => Some(PurchaseOrderStatus::PartiallyReceived),
            "received" => Some(PurchaseOrderStatus::Received),
            "cancelled" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Transition table for the purchase order state machine.
    ///
    /// Forward-only: receipts may arrive while the order is approved or
    /// sent, and partial receipts accumulate until every line is complete.
    pub fn can_transition(&self, to: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        matches!(
            (self, to),
            (Draft, PendingApproval)
                | (PendingApproval, Approved)
                | (PendingApproval, Cancelled)
                | (Approved, Sent)
                | (Approved, Cancelled)
                | (Approved, PartiallyReceived)
                | (Approved, Received)
                | (Sent, PartiallyReceived)
                | (Sent, Received)
                | (PartiallyReceived, PartiallyReceived)
                | (PartiallyReceived, Received)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
        )
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision taken on an approval step (shared by purchase orders and
/// transfers)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// Ordered vs received quantity of one purchase order line
#[derive(Debug, Clone, Copy)]
pub struct LineReceipt {
    pub ordered: Decimal,
    pub received: Decimal,
}

/// Status a purchase order should take after a warehouse receipt, derived
/// from its lines. `None` when nothing has been received yet.
pub fn derive_receipt_status(lines: &[LineReceipt]) -> Option<PurchaseOrderStatus> {
    if lines.is_empty() {
        return None;
    }
    let all_complete = lines.iter().all(|l| l.received >= l.ordered);
    let any_received = lines.iter().any(|l| l.received > Decimal::ZERO);

    if all_complete {
        Some(PurchaseOrderStatus::Received)
    } else if any_received {
        Some(PurchaseOrderStatus::PartiallyReceived)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_forward_transitions() {
        use PurchaseOrderStatus::*;
        assert!(Draft.can_transition(PendingApproval));
        assert!(PendingApproval.can_transition(Approved));
        assert!(PendingApproval.can_transition(Cancelled));
        assert!(Approved.can_transition(Sent));
        assert!(Sent.can_transition(PartiallyReceived));
        assert!(Sent.can_transition(Received));
        assert!(PartiallyReceived.can_transition(Received));
    }

    #[test]
    fn test_no_backward_transitions() {
        use PurchaseOrderStatus::*;
        assert!(!Received.can_transition(Approved));
        assert!(!Sent.can_transition(Draft));
        assert!(!Approved.can_transition(PendingApproval));
        assert!(!PendingApproval.can_transition(Draft));
        assert!(!Cancelled.can_transition(Draft));
    }

    #[test]
    fn test_no_skipping() {
        use PurchaseOrderStatus::*;
        assert!(!Draft.can_transition(Approved));
        assert!(!Draft.can_transition(Sent));
        assert!(!PendingApproval.can_transition(Sent));
    }

    #[test]
    fn test_terminal_states() {
        assert!(PurchaseOrderStatus::Received.is_terminal());
        assert!(PurchaseOrderStatus::Cancelled.is_terminal());
        assert!(!PurchaseOrderStatus::Sent.is_terminal());
    }

    #[test]
    fn test_receipt_status_all_complete() {
        let lines = [
            LineReceipt {
                ordered: dec(10),
                received: dec(10),
            },
            LineReceipt {
                ordered: dec(5),
                received: dec(7),
            },
        ];
        assert_eq!(
            derive_receipt_status(&lines),
            Some(PurchaseOrderStatus::Received)
        );
    }

    #[test]
    fn test_receipt_status_partial() {
        let lines = [
            LineReceipt {
                ordered: dec(10),
                received: dec(8),
            },
            LineReceipt {
                ordered: dec(5),
                received: dec(0),
            },
        ];
        assert_eq!(
            derive_receipt_status(&lines),
            Some(PurchaseOrderStatus::PartiallyReceived)
        );
    }

    #[test]
    fn test_receipt_status_nothing_received() {
        let lines = [LineReceipt {
            ordered: dec(10),
            received: dec(0),
        }];
        assert_eq!(derive_receipt_status(&lines), None);
        assert_eq!(derive_receipt_status(&[]), None);
    }
}
