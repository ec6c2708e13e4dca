//! Inter-location transfer models

use serde::{Deserialize, Serialize};

/// Status of an inter-location transfer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    InTransit,
    Received,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Received => "received",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransferStatus::Pending),
            "approved" => Some(TransferStatus::Approved),
            "in_transit" => Some(TransferStatus::InTransit),
            "received" => Some(TransferStatus::Received),
            "cancelled" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    /// Transition table for the transfer state machine
    pub fn can_transition(&self, to: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Pending, Cancelled) | (Approved, InTransit) | (InTransit, Received)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Received | TransferStatus::Cancelled)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use TransferStatus::*;
        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Cancelled));
        assert!(Approved.can_transition(InTransit));
        assert!(InTransit.can_transition(Received));

        assert!(!Pending.can_transition(InTransit));
        assert!(!Approved.can_transition(Received));
        assert!(!Approved.can_transition(Cancelled));
        assert!(!InTransit.can_transition(Approved));
        assert!(!Received.can_transition(InTransit));
        assert!(!Cancelled.can_transition(Approved));
    }

    #[test]
    fn test_round_trip() {
        use TransferStatus::*;
        for s in [Pending, Approved, InTransit, Received, Cancelled] {
            assert_eq!(TransferStatus::parse(s.as_str()), Some(s));
        }
    }
}
