//! Internal stock request models

use serde::{Deserialize, Serialize};

/// Status of an internal stock request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Issued,
    Confirmed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Issued => "issued",
            RequestStatus::Confirmed => "confirmed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "issued" => Some(RequestStatus::Issued),
            "confirmed" => Some(RequestStatus::Confirmed),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    /// Transition table for the internal request state machine
    pub fn can_transition(&self, to: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, to),
            (Pending, Issued) | (Pending, Cancelled) | (Issued, Confirmed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Confirmed | RequestStatus::Cancelled)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use RequestStatus::*;
        assert!(Pending.can_transition(Issued));
        assert!(Pending.can_transition(Cancelled));
        assert!(Issued.can_transition(Confirmed));

        assert!(!Pending.can_transition(Confirmed));
        assert!(!Issued.can_transition(Pending));
        assert!(!Issued.can_transition(Cancelled));
        assert!(!Confirmed.can_transition(Pending));
        assert!(!Cancelled.can_transition(Issued));
    }

    #[test]
    fn test_round_trip() {
        use RequestStatus::*;
        for s in [Pending, Issued, Confirmed, Cancelled] {
            assert_eq!(RequestStatus::parse(s.as_str()), Some(s));
        }
    }
}
