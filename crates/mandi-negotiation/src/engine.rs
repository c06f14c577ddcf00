//! # Negotiation Engine
//!
//! Orchestrates the [`Negotiation`] aggregate against the store
//! contract and the partner-service boundaries. The engine owns the
//! cross-cutting checks (who is calling, may they trade, are they
//! risk-clear) and delegates every stateful rule to the atomic store
//! commands, which re-validate through the aggregate under a lock.

use std::sync::Arc;

use mandi_core::{
    CommodityDescriptor, MandiError, NegotiationId, PartnerId, PartySide, Timestamp,
};
use mandi_match::{MatchTokenManager, TokenCode};
use mandi_partner::{CapabilityService, RiskService, RiskVerdict, TradeDirection};

use crate::message::NegotiationMessage;
use crate::negotiation::{Actor, Negotiation, StartOptions};
use crate::offer::{NegotiationOffer, OfferProposal};
use crate::store::{FinalDecision, NegotiationStore, PriorOfferDisposition};

/// Drives negotiations from a match token to a terminal outcome.
pub struct NegotiationEngine {
    store: Arc<dyn NegotiationStore>,
    tokens: Arc<MatchTokenManager>,
    capabilities: Arc<dyn CapabilityService>,
    risk: Arc<dyn RiskService>,
}

impl NegotiationEngine {
    /// Wire an engine over a store, the token manager, and the partner
    /// services.
    pub fn new(
        store: Arc<dyn NegotiationStore>,
        tokens: Arc<MatchTokenManager>,
        capabilities: Arc<dyn CapabilityService>,
        risk: Arc<dyn RiskService>,
    ) -> Self {
        Self {
            store,
            tokens,
            capabilities,
            risk,
        }
    }

    /// Start a negotiation from a match token.
    ///
    /// Reveals both identities on the token and appends the initial
    /// chat message when one is supplied.
    ///
    /// # Errors
    ///
    /// `Authorization` when the caller is not a party to the match or
    /// lacks the trading capability for its side; `Conflict` when a
    /// negotiation already exists for this token; `Expired` when the
    /// token's 30-day window has lapsed; `NotFound` for an unknown code.
    pub async fn start(
        &self,
        code: &TokenCode,
        partner: &PartnerId,
        options: StartOptions,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError> {
        let token = self.tokens.lookup(code).await?;
        let side = token.side_of(partner).ok_or_else(|| {
            MandiError::Authorization(format!(
                "partner {partner} is not a party to match {code}"
            ))
        })?;
        // Friendly pre-check; the insert below is the authoritative
        // uniqueness guard when two starts race.
        if self.store.fetch_by_token(code).await?.is_some() {
            return Err(MandiError::Conflict(format!(
                "a negotiation already exists for token {code}"
            )));
        }
        if token.is_expired(now) {
            return Err(MandiError::Expired(format!(
                "match token {code} expired at {}",
                token.expires_at
            )));
        }
        self.require_capability(partner, side.into()).await?;

        let negotiation = Negotiation::start(&token, side, &options, now);
        self.store.insert(&negotiation).await?;

        // Starting the exchange reveals both identities on the token.
        self.tokens.reveal(code, PartySide::Buyer, now).await?;
        self.tokens.reveal(code, PartySide::Seller, now).await?;

        if let Some(body) = options.initial_message {
            let message =
                NegotiationMessage::new(negotiation.id.clone(), Actor::from(side), body, now);
            self.store.append_message(&message).await?;
        }

        tracing::info!(
            negotiation = %negotiation.id,
            token = %code,
            side = %side,
            "negotiation started"
        );
        Ok(negotiation)
    }

    /// Record the caller's next offer.
    ///
    /// # Errors
    ///
    /// `Validation` for non-positive numbers; `Authorization` when the
    /// caller is not a party or lacks capability; `BusinessRule` on a
    /// FAIL risk verdict, a turn violation, or a terminal negotiation;
    /// `Expired` past the 48-hour window.
    pub async fn make_offer(
        &self,
        id: &NegotiationId,
        partner: &PartnerId,
        proposal: OfferProposal,
        now: Timestamp,
    ) -> Result<NegotiationOffer, MandiError> {
        proposal.validate()?;
        let negotiation = self.store.fetch(id).await?;
        let side = require_party(&negotiation, partner)?;
        self.require_capability(partner, side.into()).await?;
        self.require_risk_clear(partner, &negotiation.commodity, side.into())
            .await?;

        let offer = self
            .store
            .append_offer(id, side, proposal, PriorOfferDisposition::Counter, now)
            .await?;
        tracing::debug!(
            negotiation = %id,
            round = offer.round_number,
            side = %side,
            price = %offer.price_per_unit,
            "offer recorded"
        );
        Ok(offer)
    }

    /// Accept the latest offer, ending the negotiation and disclosing
    /// both identities at `TRADE` level on the match token.
    pub async fn accept(
        &self,
        id: &NegotiationId,
        partner: &PartnerId,
        message: Option<String>,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError> {
        let negotiation = self.store.fetch(id).await?;
        let side = require_party(&negotiation, partner)?;

        let updated = self
            .store
            .finalize(id, side, FinalDecision::Accept { message }, now)
            .await?;
        self.tokens.mark_traded(&updated.token_code).await?;

        tracing::info!(
            negotiation = %id,
            side = %side,
            round = updated.current_round,
            "negotiation accepted"
        );
        Ok(updated)
    }

    /// Reject the latest offer, with or without a counter.
    ///
    /// Without a counter the negotiation ends `REJECTED`. With one, the
    /// prior offer is marked rejected and the counter lands as the next
    /// round in the same atomic store command; the negotiation stays in
    /// progress.
    pub async fn reject(
        &self,
        id: &NegotiationId,
        partner: &PartnerId,
        reason: impl Into<String>,
        counter: Option<OfferProposal>,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError> {
        let reason = reason.into();
        let negotiation = self.store.fetch(id).await?;
        let side = require_party(&negotiation, partner)?;

        match counter {
            Some(proposal) => {
                proposal.validate()?;
                self.require_capability(partner, side.into()).await?;
                self.require_risk_clear(partner, &negotiation.commodity, side.into())
                    .await?;
                let offer = self
                    .store
                    .append_offer(
                        id,
                        side,
                        proposal,
                        PriorOfferDisposition::Reject { reason },
                        now,
                    )
                    .await?;
                tracing::info!(
                    negotiation = %id,
                    side = %side,
                    round = offer.round_number,
                    "offer rejected with counter"
                );
                self.store.fetch(id).await
            }
            None => {
                let updated = self
                    .store
                    .finalize(id, side, FinalDecision::Reject { reason }, now)
                    .await?;
                tracing::info!(negotiation = %id, side = %side, "negotiation rejected");
                Ok(updated)
            }
        }
    }

    /// Expire every live negotiation whose window has passed. Returns
    /// how many were expired.
    ///
    /// Failures on individual negotiations are logged and skipped; a
    /// second sweep over the same instant changes nothing.
    pub async fn expire_sweep(&self, now: Timestamp) -> Result<u32, MandiError> {
        let candidates = self.store.expirable(now).await?;
        let mut expired = 0u32;
        for candidate in candidates {
            match self.store.expire(&candidate.id, now).await {
                Ok(_) => {
                    expired += 1;
                    tracing::info!(negotiation = %candidate.id, "negotiation expired");
                }
                Err(err) => {
                    tracing::warn!(
                        negotiation = %candidate.id,
                        error = %err,
                        "expiry sweep item failed"
                    );
                }
            }
        }
        if expired > 0 {
            tracing::info!(count = expired, "expiry sweep complete");
        }
        Ok(expired)
    }

    /// Fetch a negotiation.
    pub async fn negotiation(&self, id: &NegotiationId) -> Result<Negotiation, MandiError> {
        self.store.fetch(id).await
    }

    /// All offers of a negotiation, ordered by round.
    pub async fn offers(&self, id: &NegotiationId) -> Result<Vec<NegotiationOffer>, MandiError> {
        self.store.offers_for(id).await
    }

    /// All messages of a negotiation, in send order.
    pub async fn messages(
        &self,
        id: &NegotiationId,
    ) -> Result<Vec<NegotiationMessage>, MandiError> {
        self.store.messages_for(id).await
    }

    async fn require_capability(
        &self,
        partner: &PartnerId,
        direction: TradeDirection,
    ) -> Result<(), MandiError> {
        let decision = self.capabilities.check(partner, direction).await?;
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| format!("partner {partner} may not trade {direction}"));
            return Err(MandiError::Authorization(reason));
        }
        Ok(())
    }

    async fn require_risk_clear(
        &self,
        partner: &PartnerId,
        commodity: &CommodityDescriptor,
        direction: TradeDirection,
    ) -> Result<(), MandiError> {
        let assessment = self.risk.assess(partner, commodity, direction).await?;
        match assessment.verdict {
            RiskVerdict::Fail => Err(MandiError::BusinessRule(format!(
                "risk screening failed for partner {partner}: {}",
                assessment.detail.as_deref().unwrap_or("no detail given")
            ))),
            RiskVerdict::Warn => {
                tracing::warn!(
                    partner = %partner,
                    commodity = %commodity,
                    detail = assessment.detail.as_deref().unwrap_or(""),
                    "risk screening returned WARN"
                );
                Ok(())
            }
            RiskVerdict::Pass => Ok(()),
        }
    }
}

/// Resolve which side of the negotiation the caller is.
fn require_party(
    negotiation: &Negotiation,
    partner: &PartnerId,
) -> Result<PartySide, MandiError> {
    negotiation.side_of(partner).ok_or_else(|| {
        MandiError::Authorization(format!(
            "partner {partner} is not a party to negotiation {}",
            negotiation.id
        ))
    })
}

impl std::fmt::Debug for NegotiationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiationEngine").finish_non_exhaustive()
    }
}
