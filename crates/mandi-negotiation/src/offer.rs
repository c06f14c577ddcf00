//! # Offers
//!
//! One offer per negotiation round. Offers are append-only: each is
//! created `PENDING` and resolved exactly once by the action that
//! responds to it (a counter, an accept, a reject, or the expiry
//! sweep). Nothing ever deletes or re-prices a recorded offer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mandi_core::{
    ensure_positive, MandiError, NegotiationId, OfferId, PartySide, Timestamp,
};

use crate::error::NegotiationError;

// ── Status ───────────────────────────────────────────────────────────────

/// Response state of a single offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    /// Awaiting the counterparty's response.
    Pending,
    /// The counterparty accepted these exact terms.
    Accepted,
    /// The counterparty rejected these terms.
    Rejected,
    /// Superseded by a counter-offer.
    Countered,
    /// The negotiation lapsed while this offer was pending.
    Expired,
}

impl OfferStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Countered => "COUNTERED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether a response has been recorded.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Term blocks ──────────────────────────────────────────────────────────

/// Delivery terms proposed with an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTerms {
    /// Named delivery location ("ex-warehouse Nagpur", "FOR Rajkot").
    pub location: String,
    /// Days from contract to delivery.
    pub window_days: u32,
}

/// Payment terms proposed with an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTerms {
    /// Settlement method ("RTGS", "escrow", "LC").
    pub method: String,
    /// Days from delivery to full payment.
    pub due_within_days: u32,
    /// Advance portion payable at contract, as a percentage.
    pub advance_percent: Option<Decimal>,
}

/// Quality terms proposed with an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTerms {
    /// Named grade ("FAQ", "Shankar-6 29mm").
    pub grade: Option<String>,
    /// Free-form quality conditions.
    pub notes: Option<String>,
}

/// The optional term blocks an offer may carry. All blocks absent is a
/// price-and-quantity-only offer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub delivery: Option<DeliveryTerms>,
    pub payment: Option<PaymentTerms>,
    pub quality: Option<QualityTerms>,
}

// ── AI assistance ────────────────────────────────────────────────────────

/// Annotation for offers drafted with machine assistance.
///
/// Informational only. No invariant or transition reads these fields;
/// they exist so the audit trail can distinguish assisted offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAssistMetadata {
    /// Whether the proposal text was machine-generated.
    pub ai_generated: bool,
    /// Model confidence in `0..=1`. Advisory score, never arithmetic.
    pub confidence: f64,
    /// Why the assistant proposed these terms.
    pub reasoning: Option<String>,
}

// ── Proposal ─────────────────────────────────────────────────────────────

/// Caller input for one offer: the numbers plus optional terms,
/// message, and AI annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferProposal {
    pub price_per_unit: Decimal,
    pub quantity: Decimal,
    pub terms: Option<OfferTerms>,
    pub message: Option<String>,
    pub ai: Option<AiAssistMetadata>,
}

impl OfferProposal {
    /// A bare price/quantity proposal.
    pub fn new(price_per_unit: Decimal, quantity: Decimal) -> Self {
        Self {
            price_per_unit,
            quantity,
            terms: None,
            message: None,
            ai: None,
        }
    }

    /// Attach term blocks.
    pub fn with_terms(mut self, terms: OfferTerms) -> Self {
        self.terms = Some(terms);
        self
    }

    /// Attach a chat message delivered with the offer.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the AI-assistance annotation.
    pub fn with_ai(mut self, ai: AiAssistMetadata) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Validate the proposal's numbers.
    ///
    /// # Errors
    ///
    /// `Validation` when price or quantity is not strictly positive, or
    /// the AI confidence falls outside `0..=1`.
    pub fn validate(&self) -> Result<(), MandiError> {
        ensure_positive(self.price_per_unit, "price_per_unit")?;
        ensure_positive(self.quantity, "quantity")?;
        if let Some(ai) = &self.ai {
            if !(0.0..=1.0).contains(&ai.confidence) {
                return Err(MandiError::Validation(format!(
                    "ai confidence must be within 0..=1, got {}",
                    ai.confidence
                )));
            }
        }
        Ok(())
    }
}

// ── The Offer ────────────────────────────────────────────────────────────

/// A recorded offer at one round of a negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationOffer {
    pub id: OfferId,
    pub negotiation_id: NegotiationId,
    /// 1-based position in the negotiation's offer sequence.
    pub round_number: u32,
    pub offered_by: PartySide,
    pub price_per_unit: Decimal,
    pub quantity: Decimal,
    pub terms: OfferTerms,
    /// Chat message delivered with this offer.
    pub message: Option<String>,
    /// AI-assistance annotation, if the offer was machine-drafted.
    pub ai: Option<AiAssistMetadata>,
    pub status: OfferStatus,
    /// When the response landed.
    pub responded_at: Option<Timestamp>,
    /// Message delivered with the response.
    pub response_message: Option<String>,
    pub created_at: Timestamp,
}

impl NegotiationOffer {
    /// Record a validated proposal as the offer at `round_number`.
    pub fn new(
        negotiation_id: NegotiationId,
        round_number: u32,
        offered_by: PartySide,
        proposal: OfferProposal,
        now: Timestamp,
    ) -> Self {
        Self {
            id: OfferId::new(),
            negotiation_id,
            round_number,
            offered_by,
            price_per_unit: proposal.price_per_unit,
            quantity: proposal.quantity,
            terms: proposal.terms.unwrap_or_default(),
            message: proposal.message,
            ai: proposal.ai,
            status: OfferStatus::Pending,
            responded_at: None,
            response_message: None,
            created_at: now,
        }
    }

    /// Resolve this offer with its single response.
    ///
    /// # Errors
    ///
    /// [`NegotiationError::AlreadyResolved`] when a response was already
    /// recorded; `InvalidTransition` when `status` is `PENDING`.
    pub fn resolve(
        &mut self,
        status: OfferStatus,
        response_message: Option<String>,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        if self.status.is_resolved() {
            return Err(NegotiationError::AlreadyResolved {
                offer_id: self.id.to_string(),
                status: self.status.as_str().to_string(),
            });
        }
        if status == OfferStatus::Pending {
            return Err(NegotiationError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: status.as_str().to_string(),
                reason: "an offer response must carry a resolved status".to_string(),
            });
        }
        self.status = status;
        self.responded_at = Some(now);
        self.response_message = response_message;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn proposal() -> OfferProposal {
        OfferProposal::new(
            Decimal::from_str_exact("5400").unwrap(),
            Decimal::from(500),
        )
    }

    #[test]
    fn valid_proposal_passes() {
        assert!(proposal().validate().is_ok());
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let bad = OfferProposal::new(Decimal::ZERO, Decimal::from(500));
        let err = bad.validate().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("price_per_unit"));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let bad = OfferProposal::new(
            Decimal::from_str_exact("5400").unwrap(),
            Decimal::from(-10),
        );
        assert_eq!(bad.validate().unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let bad = proposal().with_ai(AiAssistMetadata {
            ai_generated: true,
            confidence: 1.2,
            reasoning: None,
        });
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn offer_starts_pending_and_resolves_once() {
        let now = Timestamp::from_epoch_secs(1_760_000_000).unwrap();
        let mut offer =
            NegotiationOffer::new(NegotiationId::new(), 1, PartySide::Buyer, proposal(), now);
        assert_eq!(offer.status, OfferStatus::Pending);

        offer
            .resolve(OfferStatus::Countered, None, now.plus_hours(1))
            .unwrap();
        assert_eq!(offer.status, OfferStatus::Countered);
        assert_eq!(offer.responded_at, Some(now.plus_hours(1)));

        let err = offer
            .resolve(OfferStatus::Accepted, None, now.plus_hours(2))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::AlreadyResolved { .. }));
        assert_eq!(offer.status, OfferStatus::Countered);
    }

    #[test]
    fn resolving_to_pending_is_refused() {
        let now = Timestamp::from_epoch_secs(1_760_000_000).unwrap();
        let mut offer =
            NegotiationOffer::new(NegotiationId::new(), 1, PartySide::Seller, proposal(), now);
        let err = offer.resolve(OfferStatus::Pending, None, now).unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidTransition { .. }));
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&OfferStatus::Countered).unwrap(),
            "\"COUNTERED\""
        );
    }
}
