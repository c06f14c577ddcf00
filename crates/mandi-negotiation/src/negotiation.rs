//! # Negotiation Lifecycle
//!
//! Drives the buyer/seller offer exchange through the state machine:
//! `Initiated → InProgress → {Accepted | Rejected | Expired}`.
//!
//! ## Design Choice: Validated Enum over Typestate
//!
//! Offers, accepts, and rejects arrive over APIs where the current
//! status is only known at runtime, and negotiations are persisted and
//! reloaded mid-exchange. A runtime-validated enum serializes directly
//! via serde and lets every transition method re-check the persisted
//! state under the store's lock; a typestate encoding would dissolve at
//! the first database round-trip.
//!
//! ## Transition Graph
//!
//! ```text
//! INITIATED ──record_offer()──▶ IN_PROGRESS ──record_offer()──▶ IN_PROGRESS
//!     │                              │        (alternating sides)
//!     │                              ├──accept()──▶ ACCEPTED    [terminal]
//!     │                              ├──reject()──▶ REJECTED    [terminal]
//!     │                              └──expire()──▶ EXPIRED     [terminal]
//!     └──expire()──▶ EXPIRED  [terminal]
//! ```
//!
//! The aggregate is a pure synchronous state machine. Timing rules are
//! enforced against a caller-supplied `now`, so one instant governs an
//! entire composite action and tests control the clock.

use serde::{Deserialize, Serialize};

use rust_decimal::Decimal;

use mandi_core::{
    AvailabilityId, CommodityDescriptor, NegotiationId, PartnerId, PartySide, RequirementId,
    Timestamp,
};
use mandi_match::{MatchToken, TokenCode};

use crate::error::NegotiationError;
use crate::offer::{OfferProposal, OfferTerms};

/// How long a negotiation stays actionable, measured from initiation.
///
/// The window is fixed: activity updates `last_activity_at` but never
/// extends `expires_at`.
pub const NEGOTIATION_VALIDITY_HOURS: i64 = 48;

// ── Status ───────────────────────────────────────────────────────────────

/// The lifecycle status of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationStatus {
    /// Created from a match token; no offer recorded yet.
    Initiated,
    /// At least one offer is on the table.
    InProgress,
    /// The latest offer was accepted. Terminal state.
    Accepted,
    /// The latest offer was rejected without a counter. Terminal state.
    Rejected,
    /// The 48-hour window lapsed without agreement. Terminal state.
    Expired,
}

impl NegotiationStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::InProgress => "IN_PROGRESS",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Expired)
    }

    /// Valid target statuses from this status.
    pub fn valid_transitions(&self) -> &'static [NegotiationStatus] {
        match self {
            Self::Initiated => &[Self::InProgress, Self::Expired],
            Self::InProgress => &[
                Self::InProgress,
                Self::Accepted,
                Self::Rejected,
                Self::Expired,
            ],
            Self::Accepted | Self::Rejected | Self::Expired => &[],
        }
    }
}

impl std::fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Actor ────────────────────────────────────────────────────────────────

/// Who performed an action: one of the two parties, or the system
/// itself (the expiry sweep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    Buyer,
    Seller,
    System,
}

impl Actor {
    /// The canonical string name of this actor.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "BUYER",
            Self::Seller => "SELLER",
            Self::System => "SYSTEM",
        }
    }
}

impl From<PartySide> for Actor {
    fn from(side: PartySide) -> Self {
        match side {
            PartySide::Buyer => Self::Buyer,
            PartySide::Seller => Self::Seller,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Transition Record ────────────────────────────────────────────────────

/// One entry in a negotiation's append-only transition log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationTransition {
    /// Status before the transition.
    pub from_status: NegotiationStatus,
    /// Status after the transition.
    pub to_status: NegotiationStatus,
    /// Who caused it.
    pub actor: Actor,
    /// When it happened (UTC).
    pub timestamp: Timestamp,
    /// Short human-readable annotation ("offer round 2 by SELLER").
    pub note: Option<String>,
}

// ── Outcome ──────────────────────────────────────────────────────────────

/// The single terminal outcome of a negotiation, typed per ending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationOutcome {
    /// A party accepted the latest offer.
    Accepted {
        by: PartySide,
        at: Timestamp,
        message: Option<String>,
    },
    /// A party rejected the latest offer without countering.
    Rejected {
        by: PartySide,
        at: Timestamp,
        reason: String,
    },
    /// The expiry sweep closed the negotiation.
    Expired { at: Timestamp },
}

// ── Start Options ────────────────────────────────────────────────────────

/// Caller options for starting a negotiation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartOptions {
    /// Chat message delivered with the initiation.
    pub initial_message: Option<String>,
    /// The buyer delegates responses to an assistant. Informational.
    pub auto_negotiate_buyer: bool,
    /// The seller delegates responses to an assistant. Informational.
    pub auto_negotiate_seller: bool,
}

impl StartOptions {
    /// Attach the initial chat message.
    pub fn with_initial_message(mut self, message: impl Into<String>) -> Self {
        self.initial_message = Some(message.into());
        self
    }
}

// ── The Negotiation ──────────────────────────────────────────────────────

/// An alternating offer exchange between the two parties of a match.
///
/// Created via [`Negotiation::start`], then advanced by transition
/// methods that re-validate turn order, liveness, and timing on every
/// call. Exactly one negotiation may exist per match token; the store
/// enforces that uniqueness.
///
/// Every transition is appended to
/// [`transition_log`](Negotiation::transition_log). Terminal statuses
/// reject all further transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub id: NegotiationId,
    /// The match token this negotiation was started from.
    pub token_code: TokenCode,
    pub requirement_id: RequirementId,
    pub availability_id: AvailabilityId,
    pub buyer_partner_id: PartnerId,
    pub seller_partner_id: PartnerId,
    /// Copied from the token so risk checks and the eventual trade can
    /// name the commodity without consulting external records.
    pub commodity: CommodityDescriptor,
    pub status: NegotiationStatus,
    /// Count of offers recorded so far. Zero until the first offer.
    pub current_round: u32,
    /// Price of the latest offer.
    pub current_price: Option<Decimal>,
    /// Quantity of the latest offer.
    pub current_quantity: Option<Decimal>,
    /// Term blocks of the latest offer.
    pub current_terms: OfferTerms,
    pub initiated_by: PartySide,
    /// Which side made the latest offer. `None` until the first offer.
    pub last_offer_by: Option<PartySide>,
    pub auto_negotiate_buyer: bool,
    pub auto_negotiate_seller: bool,
    /// Set exactly once, when the negotiation reaches a terminal status.
    pub outcome: Option<NegotiationOutcome>,
    pub initiated_at: Timestamp,
    pub last_activity_at: Timestamp,
    /// Fixed at initiation + 48 hours; never extended by activity.
    pub expires_at: Timestamp,
    /// Complete transition history for audit purposes.
    pub transition_log: Vec<NegotiationTransition>,
}

impl Negotiation {
    /// Start a negotiation from a match token.
    ///
    /// Status begins `Initiated` at round 0 with the expiry fixed at
    /// `now` + [`NEGOTIATION_VALIDITY_HOURS`].
    pub fn start(
        token: &MatchToken,
        initiated_by: PartySide,
        options: &StartOptions,
        now: Timestamp,
    ) -> Self {
        Self {
            id: NegotiationId::new(),
            token_code: token.code.clone(),
            requirement_id: token.requirement_id.clone(),
            availability_id: token.availability_id.clone(),
            buyer_partner_id: token.buyer_partner_id.clone(),
            seller_partner_id: token.seller_partner_id.clone(),
            commodity: token.commodity.clone(),
            status: NegotiationStatus::Initiated,
            current_round: 0,
            current_price: None,
            current_quantity: None,
            current_terms: OfferTerms::default(),
            initiated_by,
            last_offer_by: None,
            auto_negotiate_buyer: options.auto_negotiate_buyer,
            auto_negotiate_seller: options.auto_negotiate_seller,
            outcome: None,
            initiated_at: now,
            last_activity_at: now,
            expires_at: now.plus_hours(NEGOTIATION_VALIDITY_HOURS),
            transition_log: vec![NegotiationTransition {
                from_status: NegotiationStatus::Initiated,
                to_status: NegotiationStatus::Initiated,
                actor: Actor::from(initiated_by),
                timestamp: now,
                note: Some("negotiation started".to_string()),
            }],
        }
    }

    /// Which side of the negotiation `partner` is, if any.
    pub fn side_of(&self, partner: &PartnerId) -> Option<PartySide> {
        if &self.buyer_partner_id == partner {
            Some(PartySide::Buyer)
        } else if &self.seller_partner_id == partner {
            Some(PartySide::Seller)
        } else {
            None
        }
    }

    /// The partner on the given side.
    pub fn partner_for(&self, side: PartySide) -> &PartnerId {
        match side {
            PartySide::Buyer => &self.buyer_partner_id,
            PartySide::Seller => &self.seller_partner_id,
        }
    }

    /// Whether offers and responses are still timely: strictly before
    /// the window closes.
    pub fn is_open_at(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }

    /// Whether the sweep may expire this negotiation: strictly past
    /// the window.
    pub fn is_past_expiry(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Validate and apply the next offer.
    ///
    /// The first offer may come from either side; every later offer must
    /// come from the side that did not make the previous one. Returns
    /// the new offer's round number.
    ///
    /// # Errors
    ///
    /// [`NegotiationError::Terminal`] after any terminal status;
    /// [`NegotiationError::Expired`] past the 48-hour window;
    /// [`NegotiationError::ConsecutiveOffer`] on an alternation breach.
    pub fn record_offer(
        &mut self,
        by: PartySide,
        proposal: &OfferProposal,
        now: Timestamp,
    ) -> Result<u32, NegotiationError> {
        self.require_live(now)?;
        if self.last_offer_by == Some(by) {
            return Err(NegotiationError::ConsecutiveOffer {
                round: self.current_round,
            });
        }
        Ok(self.apply_offer(by, proposal, "offer", now))
    }

    /// Validate and apply a reject-with-counter: the caller rejects the
    /// latest offer by putting a new one on the table.
    ///
    /// Unlike [`record_offer`](Self::record_offer) this requires an
    /// offer to exist, since there must be something to reject. The
    /// resolution of the prior offer record is the store's side of the
    /// same atomic command.
    ///
    /// # Errors
    ///
    /// As [`record_offer`](Self::record_offer), plus
    /// [`NegotiationError::NoOffer`] at round 0 and
    /// [`NegotiationError::OwnOffer`] when the caller made the latest
    /// offer.
    pub fn record_rejection_counter(
        &mut self,
        by: PartySide,
        proposal: &OfferProposal,
        now: Timestamp,
    ) -> Result<u32, NegotiationError> {
        self.require_respondable(by, "reject", now)?;
        Ok(self.apply_offer(by, proposal, "reject-with-counter", now))
    }

    /// Accept the latest offer, ending the negotiation.
    ///
    /// # Errors
    ///
    /// [`NegotiationError::NoOffer`] at round 0;
    /// [`NegotiationError::OwnOffer`] when the caller made the latest
    /// offer; `Terminal`/`Expired` per liveness.
    pub fn accept(
        &mut self,
        by: PartySide,
        message: Option<String>,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        self.require_respondable(by, "accept", now)?;
        let from = self.status;
        self.outcome = Some(NegotiationOutcome::Accepted { by, at: now, message });
        self.status = NegotiationStatus::Accepted;
        self.record_transition(
            from,
            NegotiationStatus::Accepted,
            Actor::from(by),
            Some(format!("accepted round {} by {}", self.current_round, by)),
            now,
        );
        Ok(())
    }

    /// Reject the latest offer without countering, ending the
    /// negotiation.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`accept`](Self::accept).
    pub fn reject(
        &mut self,
        by: PartySide,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        self.require_respondable(by, "reject", now)?;
        let reason = reason.into();
        let from = self.status;
        self.outcome = Some(NegotiationOutcome::Rejected {
            by,
            at: now,
            reason: reason.clone(),
        });
        self.status = NegotiationStatus::Rejected;
        self.record_transition(
            from,
            NegotiationStatus::Rejected,
            Actor::from(by),
            Some(format!("rejected: {reason}")),
            now,
        );
        Ok(())
    }

    /// Close the negotiation as expired. Called by the sweep, never by
    /// a party.
    ///
    /// # Errors
    ///
    /// [`NegotiationError::Terminal`] when already terminal;
    /// `InvalidTransition` when the expiry time has not passed.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), NegotiationError> {
        if self.status.is_terminal() {
            return Err(NegotiationError::Terminal {
                negotiation_id: self.id.to_string(),
                status: self.status.as_str().to_string(),
            });
        }
        if !self.is_past_expiry(now) {
            return Err(NegotiationError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: NegotiationStatus::Expired.as_str().to_string(),
                reason: format!("expiry time {} has not passed", self.expires_at),
            });
        }
        let from = self.status;
        self.outcome = Some(NegotiationOutcome::Expired { at: now });
        self.status = NegotiationStatus::Expired;
        self.record_transition(
            from,
            NegotiationStatus::Expired,
            Actor::System,
            Some("expired without agreement".to_string()),
            now,
        );
        Ok(())
    }

    /// Check liveness for any party action: non-terminal and timely.
    fn require_live(&self, now: Timestamp) -> Result<(), NegotiationError> {
        if self.status.is_terminal() {
            return Err(NegotiationError::Terminal {
                negotiation_id: self.id.to_string(),
                status: self.status.as_str().to_string(),
            });
        }
        if !self.is_open_at(now) {
            return Err(NegotiationError::Expired {
                negotiation_id: self.id.to_string(),
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }

    /// Check that `by` may respond to the latest offer.
    fn require_respondable(
        &self,
        by: PartySide,
        action: &'static str,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        self.require_live(now)?;
        if self.current_round == 0 {
            return Err(NegotiationError::NoOffer { action });
        }
        if self.last_offer_by == Some(by) {
            return Err(NegotiationError::OwnOffer {
                action,
                round: self.current_round,
            });
        }
        Ok(())
    }

    /// Advance the round and mirror the proposal into the current-terms
    /// fields. Callers have already validated turn order and liveness.
    fn apply_offer(
        &mut self,
        by: PartySide,
        proposal: &OfferProposal,
        kind: &str,
        now: Timestamp,
    ) -> u32 {
        let from = self.status;
        self.current_round += 1;
        self.current_price = Some(proposal.price_per_unit);
        self.current_quantity = Some(proposal.quantity);
        self.current_terms = proposal.terms.clone().unwrap_or_default();
        self.last_offer_by = Some(by);
        self.status = NegotiationStatus::InProgress;
        self.record_transition(
            from,
            NegotiationStatus::InProgress,
            Actor::from(by),
            Some(format!("{kind} round {} by {}", self.current_round, by)),
            now,
        );
        self.current_round
    }

    /// Record a transition in the audit log.
    fn record_transition(
        &mut self,
        from: NegotiationStatus,
        to: NegotiationStatus,
        actor: Actor,
        note: Option<String>,
        now: Timestamp,
    ) {
        self.transition_log.push(NegotiationTransition {
            from_status: from,
            to_status: to,
            actor,
            timestamp: now,
            note,
        });
        self.last_activity_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandi_match::MatchPairing;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn t0() -> Timestamp {
        Timestamp::from_epoch_secs(1_760_000_000).unwrap()
    }

    fn cotton_token(now: Timestamp) -> MatchToken {
        MatchToken::issue(
            MatchPairing {
                requirement_id: RequirementId::new(),
                availability_id: AvailabilityId::new(),
                buyer_partner_id: PartnerId::new(),
                seller_partner_id: PartnerId::new(),
                commodity: CommodityDescriptor::new("COTTON", "quintal").with_variety("Shankar-6"),
                match_score: 0.91,
            },
            now,
        )
    }

    fn started_at(now: Timestamp) -> Negotiation {
        Negotiation::start(
            &cotton_token(now),
            PartySide::Buyer,
            &StartOptions::default(),
            now,
        )
    }

    fn proposal(price: i64) -> OfferProposal {
        OfferProposal::new(Decimal::from(price), Decimal::from(500))
    }

    #[test]
    fn start_initializes_round_zero() {
        let negotiation = started_at(t0());
        assert_eq!(negotiation.status, NegotiationStatus::Initiated);
        assert_eq!(negotiation.current_round, 0);
        assert!(negotiation.current_price.is_none());
        assert!(negotiation.last_offer_by.is_none());
        assert_eq!(negotiation.expires_at, t0().plus_hours(48));
        assert_eq!(negotiation.transition_log.len(), 1);
    }

    #[test]
    fn first_offer_moves_to_in_progress() {
        let mut negotiation = started_at(t0());
        let round = negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0().plus_hours(1))
            .unwrap();
        assert_eq!(round, 1);
        assert_eq!(negotiation.status, NegotiationStatus::InProgress);
        assert_eq!(negotiation.current_price, Some(Decimal::from(5400)));
        assert_eq!(negotiation.last_offer_by, Some(PartySide::Buyer));
    }

    #[test]
    fn either_side_may_open() {
        let mut negotiation = started_at(t0());
        negotiation
            .record_offer(PartySide::Seller, &proposal(5500), t0())
            .unwrap();
        assert_eq!(negotiation.last_offer_by, Some(PartySide::Seller));
    }

    #[test]
    fn consecutive_offers_from_one_side_are_refused() {
        let mut negotiation = started_at(t0());
        negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0())
            .unwrap();
        let err = negotiation
            .record_offer(PartySide::Buyer, &proposal(5425), t0().plus_hours(1))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::ConsecutiveOffer { round: 1 }));
        assert!(err.to_string().contains("cannot make consecutive offers"));
        assert_eq!(negotiation.current_round, 1);
    }

    #[test]
    fn full_exchange_to_acceptance() {
        let mut negotiation = started_at(t0());
        negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0())
            .unwrap();
        negotiation
            .record_offer(PartySide::Seller, &proposal(5450), t0().plus_hours(2))
            .unwrap();
        negotiation
            .accept(PartySide::Buyer, Some("done at 5450".to_string()), t0().plus_hours(3))
            .unwrap();

        assert_eq!(negotiation.status, NegotiationStatus::Accepted);
        assert_eq!(negotiation.current_round, 2);
        assert_eq!(negotiation.last_offer_by, Some(PartySide::Seller));
        assert_eq!(negotiation.current_price, Some(Decimal::from(5450)));
        match negotiation.outcome {
            Some(NegotiationOutcome::Accepted { by, .. }) => assert_eq!(by, PartySide::Buyer),
            ref other => panic!("unexpected outcome: {other:?}"),
        }
        // start + 2 offers + accept
        assert_eq!(negotiation.transition_log.len(), 4);
    }

    #[test]
    fn accept_before_any_offer_is_refused() {
        let mut negotiation = started_at(t0());
        let err = negotiation
            .accept(PartySide::Seller, None, t0())
            .unwrap_err();
        assert!(matches!(err, NegotiationError::NoOffer { action: "accept" }));
        assert_eq!(negotiation.status, NegotiationStatus::Initiated);
    }

    #[test]
    fn own_offer_cannot_be_accepted() {
        let mut negotiation = started_at(t0());
        negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0())
            .unwrap();
        let err = negotiation
            .accept(PartySide::Buyer, None, t0().plus_hours(1))
            .unwrap_err();
        assert!(matches!(
            err,
            NegotiationError::OwnOffer { action: "accept", round: 1 }
        ));
    }

    #[test]
    fn reject_without_counter_is_terminal() {
        let mut negotiation = started_at(t0());
        negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0())
            .unwrap();
        negotiation
            .reject(PartySide::Seller, "price below floor", t0().plus_hours(1))
            .unwrap();
        assert_eq!(negotiation.status, NegotiationStatus::Rejected);
        match &negotiation.outcome {
            Some(NegotiationOutcome::Rejected { by, reason, .. }) => {
                assert_eq!(*by, PartySide::Seller);
                assert_eq!(reason, "price below floor");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let err = negotiation
            .record_offer(PartySide::Buyer, &proposal(5500), t0().plus_hours(2))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Terminal { .. }));
    }

    #[test]
    fn rejection_counter_keeps_the_negotiation_alive() {
        let mut negotiation = started_at(t0());
        negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0())
            .unwrap();
        let round = negotiation
            .record_rejection_counter(PartySide::Seller, &proposal(5475), t0().plus_hours(1))
            .unwrap();
        assert_eq!(round, 2);
        assert_eq!(negotiation.status, NegotiationStatus::InProgress);
        assert_eq!(negotiation.last_offer_by, Some(PartySide::Seller));
    }

    #[test]
    fn rejection_counter_needs_an_offer_to_reject() {
        let mut negotiation = started_at(t0());
        let err = negotiation
            .record_rejection_counter(PartySide::Seller, &proposal(5475), t0())
            .unwrap_err();
        assert!(matches!(err, NegotiationError::NoOffer { action: "reject" }));
        assert_eq!(negotiation.current_round, 0);
    }

    #[test]
    fn offers_stop_at_the_window_boundary() {
        let mut negotiation = started_at(t0());
        // Strictly before the boundary: fine.
        negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0().plus_hours(47))
            .unwrap();
        // Exactly at the boundary: no longer open.
        let err = negotiation
            .record_offer(PartySide::Seller, &proposal(5450), t0().plus_hours(48))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Expired { .. }));
    }

    #[test]
    fn expire_requires_the_window_to_have_passed() {
        let mut negotiation = started_at(t0());
        let err = negotiation.expire(t0().plus_hours(48)).unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidTransition { .. }));

        negotiation.expire(t0().plus_hours(49)).unwrap();
        assert_eq!(negotiation.status, NegotiationStatus::Expired);
        assert!(matches!(
            negotiation.outcome,
            Some(NegotiationOutcome::Expired { .. })
        ));

        let err = negotiation.expire(t0().plus_hours(50)).unwrap_err();
        assert!(matches!(err, NegotiationError::Terminal { .. }));
    }

    #[test]
    fn action_on_expired_status_is_a_terminal_error_not_expired() {
        let mut negotiation = started_at(t0());
        negotiation.expire(t0().plus_hours(49)).unwrap();
        let err = negotiation
            .accept(PartySide::Buyer, None, t0().plus_hours(50))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Terminal { .. }));
    }

    #[test]
    fn expiry_is_not_extended_by_activity() {
        let mut negotiation = started_at(t0());
        negotiation
            .record_offer(PartySide::Buyer, &proposal(5400), t0().plus_hours(40))
            .unwrap();
        assert_eq!(negotiation.last_activity_at, t0().plus_hours(40));
        assert_eq!(negotiation.expires_at, t0().plus_hours(48));
    }

    #[test]
    fn side_of_distinguishes_the_parties() {
        let negotiation = started_at(t0());
        let buyer = negotiation.buyer_partner_id.clone();
        let seller = negotiation.seller_partner_id.clone();
        assert_eq!(negotiation.side_of(&buyer), Some(PartySide::Buyer));
        assert_eq!(negotiation.side_of(&seller), Some(PartySide::Seller));
        assert_eq!(negotiation.side_of(&PartnerId::new()), None);
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&NegotiationStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        let parsed: NegotiationStatus = serde_json::from_str("\"EXPIRED\"").unwrap();
        assert_eq!(parsed, NegotiationStatus::Expired);
    }

    #[test]
    fn outcome_serializes_with_a_result_tag() {
        let outcome = NegotiationOutcome::Expired { at: t0() };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["result"], "EXPIRED");
    }

    // ── Property: alternation and gapless rounds ─────────────────────────

    #[derive(Debug, Clone)]
    enum Op {
        Offer(PartySide),
        Counter(PartySide),
        Accept(PartySide),
        Reject(PartySide),
        AdvanceHours(i64),
        Expire,
    }

    fn side_strategy() -> impl Strategy<Value = PartySide> {
        prop_oneof![Just(PartySide::Buyer), Just(PartySide::Seller)]
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            side_strategy().prop_map(Op::Offer),
            side_strategy().prop_map(Op::Counter),
            side_strategy().prop_map(Op::Accept),
            side_strategy().prop_map(Op::Reject),
            (1i64..24).prop_map(Op::AdvanceHours),
            Just(Op::Expire),
        ]
    }

    proptest! {
        #[test]
        fn rounds_stay_gapless_and_sides_alternate(
            ops in proptest::collection::vec(op_strategy(), 1..40)
        ) {
            let mut negotiation = started_at(t0());
            let mut clock = t0();
            let mut offers: Vec<(u32, PartySide)> = Vec::new();

            for op in ops {
                let status_before = negotiation.status;
                match op {
                    Op::Offer(side) => {
                        if let Ok(round) =
                            negotiation.record_offer(side, &proposal(5400), clock)
                        {
                            offers.push((round, side));
                        }
                    }
                    Op::Counter(side) => {
                        if let Ok(round) = negotiation
                            .record_rejection_counter(side, &proposal(5450), clock)
                        {
                            offers.push((round, side));
                        }
                    }
                    Op::Accept(side) => {
                        let _ = negotiation.accept(side, None, clock);
                    }
                    Op::Reject(side) => {
                        let _ = negotiation.reject(side, "no", clock);
                    }
                    Op::AdvanceHours(hours) => {
                        clock = clock.plus_hours(hours);
                    }
                    Op::Expire => {
                        let _ = negotiation.expire(clock);
                    }
                }

                // Terminal statuses never change again.
                if status_before.is_terminal() {
                    prop_assert_eq!(negotiation.status, status_before);
                }
                // The round counter equals the number of recorded offers.
                prop_assert_eq!(negotiation.current_round as usize, offers.len());
                // Rounds are exactly 1..=current_round.
                for (index, (round, _)) in offers.iter().enumerate() {
                    prop_assert_eq!(*round as usize, index + 1);
                }
                // No two consecutive offers share a side.
                for pair in offers.windows(2) {
                    prop_assert_ne!(pair[0].1, pair[1].1);
                }
            }
        }
    }
}
