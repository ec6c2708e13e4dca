//! Inventory ledger models
//!
//! The ledger is an append-only log of stock movements plus a current
//! position (quantity and weighted average cost) per item and location.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of inventory transactions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Goods received from a supplier via the receiving pipeline
    Inbound,
    /// Stock issued for internal consumption
    Outbound,
    /// Stock arriving at the destination of a transfer
    TransferIn,
    /// Stock leaving the source of a transfer
    TransferOut,
    /// Manual correction
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Inbound => "inbound",
            TransactionType::Outbound => "outbound",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(TransactionType::Inbound),
            "outbound" => Some(TransactionType::Outbound),
            "transfer_in" => Some(TransactionType::TransferIn),
            "transfer_out" => Some(TransactionType::TransferOut),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }

    /// Inherent direction of this movement type. Adjustments carry their
    /// own direction on the transaction record.
    pub fn direction(&self) -> Option<TransactionDirection> {
        match self {
            TransactionType::Inbound | TransactionType::TransferIn => {
                Some(TransactionDirection::In)
            }
            TransactionType::Outbound | TransactionType::TransferOut => {
                Some(TransactionDirection::Out)
            }
            TransactionType::Adjustment => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    In,
    Out,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::In => "in",
            TransactionDirection::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(TransactionDirection::In),
            "out" => Some(TransactionDirection::Out),
            _ => None,
        }
    }
}

/// Signed quantity of a movement, for reconstructing a position from its
/// transaction history (in-movements positive, out-movements negative).
pub fn signed_quantity(direction: TransactionDirection, quantity: Decimal) -> Decimal {
    match direction {
        TransactionDirection::In => quantity,
        TransactionDirection::Out => -quantity,
    }
}

/// Link from a ledger transaction back to the workflow entity that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reference_type", content = "reference_id", rename_all = "snake_case")]
pub enum TransactionReference {
    PurchaseOrder(Uuid),
    Receiving(Uuid),
    InternalRequest(Uuid),
    Transfer(Uuid),
    Adjustment,
}

impl TransactionReference {
    pub fn kind(&self) -> &'static str {
        match self {
            TransactionReference::PurchaseOrder(_) => "purchase_order",
            TransactionReference::Receiving(_) => "receiving",
            TransactionReference::InternalRequest(_) => "internal_request",
            TransactionReference::Transfer(_) => "transfer",
            TransactionReference::Adjustment => "adjustment",
        }
    }

    pub fn entity_id(&self) -> Option<Uuid> {
        match self {
            TransactionReference::PurchaseOrder(id)
            | TransactionReference::Receiving(id)
            | TransactionReference::InternalRequest(id)
            | TransactionReference::Transfer(id) => Some(*id),
            TransactionReference::Adjustment => None,
        }
    }

    /// Rebuild the reference from its stored (kind, id) pair
    pub fn from_parts(kind: &str, id: Option<Uuid>) -> Option<Self> {
        match (kind, id) {
            ("purchase_order", Some(id)) => Some(TransactionReference::PurchaseOrder(id)),
            ("receiving", Some(id)) => Some(TransactionReference::Receiving(id)),
            ("internal_request", Some(id)) => Some(TransactionReference::InternalRequest(id)),
            ("transfer", Some(id)) => Some(TransactionReference::Transfer(id)),
            ("adjustment", None) => Some(TransactionReference::Adjustment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_round_trip() {
        for t in [
            TransactionType::Inbound,
            TransactionType::Outbound,
            TransactionType::TransferIn,
            TransactionType::TransferOut,
            TransactionType::Adjustment,
        ] {
            assert_eq!(TransactionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TransactionType::parse("unknown"), None);
    }

    #[test]
    fn test_direction() {
        assert_eq!(
            TransactionType::Inbound.direction(),
            Some(TransactionDirection::In)
        );
        assert_eq!(
            TransactionType::TransferIn.direction(),
            Some(TransactionDirection::In)
        );
        assert_eq!(
            TransactionType::Outbound.direction(),
            Some(TransactionDirection::Out)
        );
        assert_eq!(
            TransactionType::TransferOut.direction(),
            Some(TransactionDirection::Out)
        );
        assert_eq!(TransactionType::Adjustment.direction(), None);
    }

    #[test]
    fn test_signed_quantity() {
        let qty = Decimal::from(5);
        assert_eq!(signed_quantity(TransactionDirection::In, qty), qty);
        assert_eq!(signed_quantity(TransactionDirection::Out, qty), -qty);
    }

    #[test]
    fn test_reference_round_trip() {
        let id = Uuid::new_v4();
        for r in [
            TransactionReference::PurchaseOrder(id),
            TransactionReference::Receiving(id),
            TransactionReference::InternalRequest(id),
            TransactionReference::Transfer(id),
            TransactionReference::Adjustment,
        ] {
            assert_eq!(
                TransactionReference::from_parts(r.kind(), r.entity_id()),
                Some(r)
            );
        }
    }

    #[test]
    fn test_reference_rejects_mismatched_parts() {
        assert_eq!(TransactionReference::from_parts("purchase_order", None), None);
        assert_eq!(
            TransactionReference::from_parts("adjustment", Some(Uuid::new_v4())),
            None
        );
        assert_eq!(TransactionReference::from_parts("invoice", None), None);
    }
}
