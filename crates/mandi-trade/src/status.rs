//! # Trade Status
//!
//! Lifecycle states of an instant trade contract and the transition table
//! that governs them.
//!
//! ## Transition Graph
//!
//! ```text
//! PENDING_BRANCH_SELECTION ──> ACTIVE ──> IN_TRANSIT ──> DELIVERED ──> COMPLETED
//!        │                      │  │          │              │
//!        │                      │  └──────────┴──────────────┴──> DISPUTED
//!        │                      │                                   │   │
//!        └──────> CANCELLED <───┴───────────────────────────────────┘   └──> ACTIVE
//! ```
//!
//! `COMPLETED` and `CANCELLED` are terminal. A disputed trade can be
//! reinstated to `ACTIVE` or cancelled once the parties settle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a trade, validated against the transition table on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Created without a full set of branch addresses; awaiting selection.
    PendingBranchSelection,
    /// Contract in force, goods not yet dispatched.
    Active,
    /// Goods dispatched from the seller's branch.
    InTransit,
    /// Goods received at the buyer's branch.
    Delivered,
    /// Settled and closed.
    Completed,
    /// Called off before completion.
    Cancelled,
    /// One party raised a dispute; lifecycle paused pending resolution.
    Disputed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::PendingBranchSelection => "PENDING_BRANCH_SELECTION",
            TradeStatus::Active => "ACTIVE",
            TradeStatus::InTransit => "IN_TRANSIT",
            TradeStatus::Delivered => "DELIVERED",
            TradeStatus::Completed => "COMPLETED",
            TradeStatus::Cancelled => "CANCELLED",
            TradeStatus::Disputed => "DISPUTED",
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Completed | TradeStatus::Cancelled)
    }

    /// Statuses reachable from this one in a single step.
    pub fn valid_transitions(&self) -> &'static [TradeStatus] {
        match self {
            TradeStatus::PendingBranchSelection => {
                &[TradeStatus::Active, TradeStatus::Cancelled]
            }
            TradeStatus::Active => &[
                TradeStatus::InTransit,
                TradeStatus::Cancelled,
                TradeStatus::Disputed,
            ],
            TradeStatus::InTransit => &[TradeStatus::Delivered, TradeStatus::Disputed],
            TradeStatus::Delivered => &[TradeStatus::Completed, TradeStatus::Disputed],
            TradeStatus::Disputed => &[TradeStatus::Active, TradeStatus::Cancelled],
            TradeStatus::Completed | TradeStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: TradeStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    /// Every status, for exhaustive table checks.
    pub fn all() -> [TradeStatus; 7] {
        [
            TradeStatus::PendingBranchSelection,
            TradeStatus::Active,
            TradeStatus::InTransit,
            TradeStatus::Delivered,
            TradeStatus::Completed,
            TradeStatus::Cancelled,
            TradeStatus::Disputed,
        ]
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_edges_are_valid() {
        assert!(TradeStatus::PendingBranchSelection.can_transition_to(TradeStatus::Active));
        assert!(TradeStatus::Active.can_transition_to(TradeStatus::InTransit));
        assert!(TradeStatus::InTransit.can_transition_to(TradeStatus::Delivered));
        assert!(TradeStatus::Delivered.can_transition_to(TradeStatus::Completed));
    }

    #[test]
    fn disputes_can_be_raised_after_activation_and_settled_either_way() {
        assert!(TradeStatus::Active.can_transition_to(TradeStatus::Disputed));
        assert!(TradeStatus::InTransit.can_transition_to(TradeStatus::Disputed));
        assert!(TradeStatus::Delivered.can_transition_to(TradeStatus::Disputed));
        assert!(TradeStatus::Disputed.can_transition_to(TradeStatus::Active));
        assert!(TradeStatus::Disputed.can_transition_to(TradeStatus::Cancelled));
        assert!(!TradeStatus::PendingBranchSelection.can_transition_to(TradeStatus::Disputed));
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for status in TradeStatus::all() {
            if status.is_terminal() {
                assert!(status.valid_transitions().is_empty(), "{status} should be closed");
            } else {
                assert!(!status.valid_transitions().is_empty(), "{status} should have exits");
            }
        }
    }

    #[test]
    fn skipping_dispatch_is_rejected() {
        assert!(!TradeStatus::Active.can_transition_to(TradeStatus::Delivered));
        assert!(!TradeStatus::PendingBranchSelection.can_transition_to(TradeStatus::InTransit));
        assert!(!TradeStatus::Completed.can_transition_to(TradeStatus::Disputed));
    }

    #[test]
    fn serializes_screaming_snake() {
        let json = serde_json::to_string(&TradeStatus::PendingBranchSelection).unwrap();
        assert_eq!(json, "\"PENDING_BRANCH_SELECTION\"");
        let back: TradeStatus = serde_json::from_str("\"IN_TRANSIT\"").unwrap();
        assert_eq!(back, TradeStatus::InTransit);
    }
}
