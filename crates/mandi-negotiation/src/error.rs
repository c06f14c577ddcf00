//! # Negotiation Errors
//!
//! Domain errors raised by the negotiation state machine. The engine and
//! the stores convert them into the workspace taxonomy
//! ([`MandiError`]) via `From`, so callers outside this crate see one
//! error surface.

use thiserror::Error;

use mandi_core::{MandiError, Timestamp};

/// Errors raised while validating or applying negotiation transitions.
#[derive(Debug, Clone, Error)]
pub enum NegotiationError {
    /// A transition edge outside the state machine was requested.
    #[error("invalid negotiation transition {from} -> {to}: {reason}")]
    InvalidTransition {
        /// Status the negotiation is in.
        from: String,
        /// Status the caller asked for.
        to: String,
        /// Which rule refused the edge.
        reason: String,
    },

    /// The negotiation is in a terminal status and accepts no action.
    #[error("negotiation {negotiation_id} is terminal in status {status}")]
    Terminal {
        negotiation_id: String,
        status: String,
    },

    /// The negotiation's 48-hour window has lapsed.
    #[error("negotiation {negotiation_id} expired at {expires_at}")]
    Expired {
        negotiation_id: String,
        expires_at: Timestamp,
    },

    /// The same side tried to submit two offers in a row.
    #[error("cannot make consecutive offers: round {round} is awaiting a response")]
    ConsecutiveOffer { round: u32 },

    /// Accept or reject was called before any offer existed.
    #[error("no offer to {action} yet")]
    NoOffer { action: &'static str },

    /// The side that made the latest offer tried to respond to it.
    #[error("cannot {action} your own offer (round {round})")]
    OwnOffer { action: &'static str, round: u32 },

    /// An offer that already carries a response was resolved again.
    #[error("offer {offer_id} is already resolved as {status}")]
    AlreadyResolved { offer_id: String, status: String },
}

impl From<NegotiationError> for MandiError {
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::Expired { .. } => MandiError::Expired(err.to_string()),
            NegotiationError::AlreadyResolved { .. } => MandiError::Conflict(err.to_string()),
            NegotiationError::InvalidTransition { .. }
            | NegotiationError::Terminal { .. }
            | NegotiationError::ConsecutiveOffer { .. }
            | NegotiationError::NoOffer { .. }
            | NegotiationError::OwnOffer { .. } => MandiError::BusinessRule(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_maps_to_the_expired_category() {
        let err = NegotiationError::Expired {
            negotiation_id: "negotiation:test".to_string(),
            expires_at: Timestamp::from_epoch_secs(1_700_000_000).unwrap(),
        };
        let mapped: MandiError = err.into();
        assert_eq!(mapped.code(), "EXPIRED");
    }

    #[test]
    fn turn_violations_are_business_rule_errors() {
        let err = NegotiationError::OwnOffer {
            action: "accept",
            round: 3,
        };
        assert_eq!(err.to_string(), "cannot accept your own offer (round 3)");
        let mapped: MandiError = err.into();
        assert_eq!(mapped.code(), "BUSINESS_RULE_ERROR");
    }

    #[test]
    fn stale_offer_resolution_maps_to_conflict() {
        let err = NegotiationError::AlreadyResolved {
            offer_id: "offer:test".to_string(),
            status: "COUNTERED".to_string(),
        };
        let mapped: MandiError = err.into();
        assert_eq!(mapped.code(), "CONFLICT");
    }
}
