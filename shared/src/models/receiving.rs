//! Receiving inspection pipeline models
//!
//! Goods arriving against a purchase order pass through three stages, each
//! performed by a different actor: procurement verification, quality
//! control inspection, and warehouse receipt.

use serde::{Deserialize, Serialize};

/// Status of a receiving record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReceivingStatus {
    Pending,
    ProcVerified,
    QcApproved,
    QcRejected,
    Received,
    Cancelled,
}

impl ReceivingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceivingStatus::Pending => "pending",
            ReceivingStatus::ProcVerified => "proc_verified",
            ReceivingStatus::QcApproved => "qc_approved",
            ReceivingStatus::QcRejected => "qc_rejected",
            ReceivingStatus::Received => "received",
            ReceivingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReceivingStatus::Pending),
            "proc_verified" => Some(ReceivingStatus::ProcVerified),
            "qc_approved" => Some(ReceivingStatus::QcApproved),
            "qc_rejected" => Some(ReceivingStatus::QcRejected),
            "received" => Some(ReceivingStatus::Received),
            "cancelled" => Some(ReceivingStatus::Cancelled),
            _ => None,
        }
    }

    /// Transition table for the receiving state machine
    pub fn can_transition(&self, to: ReceivingStatus) -> bool {
        use ReceivingStatus::*;
        matches!(
            (self, to),
            (Pending, ProcVerified)
                | (Pending, Cancelled)
                | (ProcVerified, QcApproved)
                | (ProcVerified, QcRejected)
                | (ProcVerified, Cancelled)
                | (QcApproved, Received)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReceivingStatus::QcRejected | ReceivingStatus::Received | ReceivingStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ReceivingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of the QC inspection step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QcResult {
    Accepted,
    Partial,
    Rejected,
}

impl QcResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcResult::Accepted => "accepted",
            QcResult::Partial => "partial",
            QcResult::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(QcResult::Accepted),
            "partial" => Some(QcResult::Partial),
            "rejected" => Some(QcResult::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for QcResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order() {
        use ReceivingStatus::*;
        assert!(Pending.can_transition(ProcVerified));
        assert!(ProcVerified.can_transition(QcApproved));
        assert!(ProcVerified.can_transition(QcRejected));
        assert!(QcApproved.can_transition(Received));
    }

    #[test]
    fn test_no_stage_skipping() {
        use ReceivingStatus::*;
        assert!(!Pending.can_transition(QcApproved));
        assert!(!Pending.can_transition(Received));
        assert!(!ProcVerified.can_transition(Received));
    }

    #[test]
    fn test_terminal_states() {
        use ReceivingStatus::*;
        assert!(QcRejected.is_terminal());
        assert!(Received.is_terminal());
        assert!(Cancelled.is_terminal());
        for terminal in [QcRejected, Received, Cancelled] {
            for next in [Pending, ProcVerified, QcApproved, Received] {
                assert!(!terminal.can_transition(next));
            }
        }
    }

    #[test]
    fn test_status_round_trip() {
        use ReceivingStatus::*;
        for s in [Pending, ProcVerified, QcApproved, QcRejected, Received, Cancelled] {
            assert_eq!(ReceivingStatus::parse(s.as_str()), Some(s));
        }
    }
}
