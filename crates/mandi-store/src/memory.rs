//! In-memory store backing tests, the demo CLI, and runs without a
//! database.
//!
//! One mutex over the whole state gives every composite command the
//! exclusive lock the store contracts ask for. The guard is never held
//! across an await; each method locks, works, and releases.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;

use mandi_core::{MandiError, NegotiationId, PartySide, Timestamp, TradeId};
use mandi_match::{MatchToken, TokenCode, TokenStore};
use mandi_negotiation::{
    Actor, FinalDecision, Negotiation, NegotiationMessage, NegotiationOffer, NegotiationStore,
    OfferProposal, OfferStatus, PriorOfferDisposition,
};
use mandi_trade::{Trade, TradeDraft, TradeNumber, TradeStatus, TradeStore};

#[derive(Default)]
struct Inner {
    tokens: HashMap<TokenCode, MatchToken>,
    negotiations: HashMap<NegotiationId, Negotiation>,
    negotiation_by_token: HashMap<TokenCode, NegotiationId>,
    offers: HashMap<NegotiationId, Vec<NegotiationOffer>>,
    messages: HashMap<NegotiationId, Vec<NegotiationMessage>>,
    trades: HashMap<TradeId, Trade>,
    trade_by_negotiation: HashMap<NegotiationId, TradeId>,
    /// Last allocated trade sequence, per calendar year.
    trade_counters: HashMap<i32, u32>,
}

impl Inner {
    fn negotiation(&self, id: &NegotiationId) -> Result<Negotiation, MandiError> {
        self.negotiations
            .get(id)
            .cloned()
            .ok_or_else(|| MandiError::not_found("negotiation", id.to_string()))
    }

    fn pending_offer_mut(&mut self, id: &NegotiationId) -> Option<&mut NegotiationOffer> {
        self.offers
            .get_mut(id)
            .and_then(|offers| offers.iter_mut().rev().find(|o| o.status == OfferStatus::Pending))
    }
}

/// Store implementing every persistence contract over process memory.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore { inner: Mutex::new(Inner::default()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryStore")
            .field("tokens", &inner.tokens.len())
            .field("negotiations", &inner.negotiations.len())
            .field("trades", &inner.trades.len())
            .finish()
    }
}

// ── Match tokens ─────────────────────────────────────────────────────────

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert(&self, token: &MatchToken) -> Result<(), MandiError> {
        let mut inner = self.inner.lock();
        if inner.tokens.contains_key(&token.code) {
            return Err(MandiError::Conflict(format!(
                "match token {} already exists",
                token.code
            )));
        }
        inner.tokens.insert(token.code.clone(), token.clone());
        Ok(())
    }

    async fn fetch(&self, code: &TokenCode) -> Result<MatchToken, MandiError> {
        self.inner
            .lock()
            .tokens
            .get(code)
            .cloned()
            .ok_or_else(|| MandiError::not_found("match token", code.to_string()))
    }

    async fn update(&self, token: &MatchToken) -> Result<(), MandiError> {
        let mut inner = self.inner.lock();
        match inner.tokens.get_mut(&token.code) {
            Some(slot) => {
                *slot = token.clone();
                Ok(())
            }
            None => Err(MandiError::not_found("match token", token.code.to_string())),
        }
    }
}

// ── Negotiations ─────────────────────────────────────────────────────────

#[async_trait]
impl NegotiationStore for MemoryStore {
    async fn insert(&self, negotiation: &Negotiation) -> Result<(), MandiError> {
        let mut inner = self.inner.lock();
        if inner.negotiation_by_token.contains_key(&negotiation.token_code) {
            return Err(MandiError::Conflict(format!(
                "a negotiation already exists for token {}",
                negotiation.token_code
            )));
        }
        inner
            .negotiation_by_token
            .insert(negotiation.token_code.clone(), negotiation.id.clone());
        inner.negotiations.insert(negotiation.id.clone(), negotiation.clone());
        Ok(())
    }

    async fn fetch(&self, id: &NegotiationId) -> Result<Negotiation, MandiError> {
        self.inner.lock().negotiation(id)
    }

    async fn fetch_by_token(
        &self,
        code: &TokenCode,
    ) -> Result<Option<Negotiation>, MandiError> {
        let inner = self.inner.lock();
        Ok(inner
            .negotiation_by_token
            .get(code)
            .and_then(|id| inner.negotiations.get(id))
            .cloned())
    }

    async fn append_offer(
        &self,
        id: &NegotiationId,
        by: PartySide,
        proposal: OfferProposal,
        disposition: PriorOfferDisposition,
        now: Timestamp,
    ) -> Result<NegotiationOffer, MandiError> {
        let inner = &mut *self.inner.lock();
        let mut negotiation = inner.negotiation(id)?;
        let round = match &disposition {
            PriorOfferDisposition::Counter => negotiation.record_offer(by, &proposal, now)?,
            PriorOfferDisposition::Reject { .. } => {
                negotiation.record_rejection_counter(by, &proposal, now)?
            }
        };
        if let Some(prior) = inner.pending_offer_mut(id) {
            match &disposition {
                PriorOfferDisposition::Counter => {
                    prior.resolve(OfferStatus::Countered, None, now)?
                }
                PriorOfferDisposition::Reject { reason } => {
                    prior.resolve(OfferStatus::Rejected, Some(reason.clone()), now)?
                }
            }
        }
        let offer = NegotiationOffer::new(negotiation.id.clone(), round, by, proposal, now);
        inner.offers.entry(id.clone()).or_default().push(offer.clone());
        inner.negotiations.insert(id.clone(), negotiation);
        Ok(offer)
    }

    async fn finalize(
        &self,
        id: &NegotiationId,
        by: PartySide,
        decision: FinalDecision,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError> {
        let inner = &mut *self.inner.lock();
        let mut negotiation = inner.negotiation(id)?;
        let response = match &decision {
            FinalDecision::Accept { message } => {
                negotiation.accept(by, message.clone(), now)?;
                message.clone()
            }
            FinalDecision::Reject { reason } => {
                negotiation.reject(by, reason.clone(), now)?;
                Some(reason.clone())
            }
        };
        let offer_status = match &decision {
            FinalDecision::Accept { .. } => OfferStatus::Accepted,
            FinalDecision::Reject { .. } => OfferStatus::Rejected,
        };
        if let Some(offer) = inner.pending_offer_mut(id) {
            offer.resolve(offer_status, response.clone(), now)?;
        }
        if let Some(body) = response {
            inner
                .messages
                .entry(id.clone())
                .or_default()
                .push(NegotiationMessage::new(id.clone(), Actor::from(by), body, now));
        }
        inner.negotiations.insert(id.clone(), negotiation.clone());
        Ok(negotiation)
    }

    async fn expire(
        &self,
        id: &NegotiationId,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError> {
        let inner = &mut *self.inner.lock();
        let mut negotiation = inner.negotiation(id)?;
        negotiation.expire(now)?;
        if let Some(offer) = inner.pending_offer_mut(id) {
            offer.resolve(OfferStatus::Expired, None, now)?;
        }
        inner.messages.entry(id.clone()).or_default().push(NegotiationMessage::new(
            id.clone(),
            Actor::System,
            "expired without agreement",
            now,
        ));
        inner.negotiations.insert(id.clone(), negotiation.clone());
        Ok(negotiation)
    }

    async fn expirable(&self, now: Timestamp) -> Result<Vec<Negotiation>, MandiError> {
        let inner = self.inner.lock();
        let mut due: Vec<Negotiation> = inner
            .negotiations
            .values()
            .filter(|n| !n.status.is_terminal() && n.is_past_expiry(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(due)
    }

    async fn offers_for(
        &self,
        id: &NegotiationId,
    ) -> Result<Vec<NegotiationOffer>, MandiError> {
        Ok(self.inner.lock().offers.get(id).cloned().unwrap_or_default())
    }

    async fn latest_offer(
        &self,
        id: &NegotiationId,
    ) -> Result<Option<NegotiationOffer>, MandiError> {
        Ok(self.inner.lock().offers.get(id).and_then(|offers| offers.last()).cloned())
    }

    async fn append_message(&self, message: &NegotiationMessage) -> Result<(), MandiError> {
        let inner = &mut *self.inner.lock();
        if !inner.negotiations.contains_key(&message.negotiation_id) {
            return Err(MandiError::not_found(
                "negotiation",
                message.negotiation_id.to_string(),
            ));
        }
        inner
            .messages
            .entry(message.negotiation_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn messages_for(
        &self,
        id: &NegotiationId,
    ) -> Result<Vec<NegotiationMessage>, MandiError> {
        Ok(self.inner.lock().messages.get(id).cloned().unwrap_or_default())
    }
}

// ── Trades ───────────────────────────────────────────────────────────────

#[async_trait]
impl TradeStore for MemoryStore {
    async fn create(&self, draft: TradeDraft) -> Result<Trade, MandiError> {
        let inner = &mut *self.inner.lock();
        if inner.trade_by_negotiation.contains_key(&draft.negotiation_id) {
            return Err(MandiError::Conflict(format!(
                "a trade already exists for negotiation {}",
                draft.negotiation_id
            )));
        }
        let year = draft.trade_date.year();
        let counter = inner.trade_counters.entry(year).or_insert(0);
        *counter += 1;
        let number = TradeNumber::from_parts(year, *counter);
        let trade = draft.finalize(number);
        inner
            .trade_by_negotiation
            .insert(trade.negotiation_id.clone(), trade.id.clone());
        inner.trades.insert(trade.id.clone(), trade.clone());
        Ok(trade)
    }

    async fn fetch(&self, id: &TradeId) -> Result<Trade, MandiError> {
        self.inner
            .lock()
            .trades
            .get(id)
            .cloned()
            .ok_or_else(|| MandiError::not_found("trade", id.to_string()))
    }

    async fn fetch_by_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<Trade>, MandiError> {
        let inner = self.inner.lock();
        Ok(inner
            .trade_by_negotiation
            .get(negotiation_id)
            .and_then(|id| inner.trades.get(id))
            .cloned())
    }

    async fn update(&self, trade: &Trade, expected: TradeStatus) -> Result<(), MandiError> {
        let mut inner = self.inner.lock();
        let slot = inner
            .trades
            .get_mut(&trade.id)
            .ok_or_else(|| MandiError::not_found("trade", trade.id.to_string()))?;
        if slot.status != expected {
            return Err(MandiError::Conflict(format!(
                "trade {} changed concurrently (expected status {expected}, found {})",
                trade.number, slot.status
            )));
        }
        *slot = trade.clone();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Trade>, MandiError> {
        let inner = self.inner.lock();
        let mut trades: Vec<Trade> = inner.trades.values().cloned().collect();
        trades.sort_by(|a, b| {
            b.trade_date
                .cmp(&a.trade_date)
                .then_with(|| b.number.sequence().cmp(&a.number.sequence()))
        });
        Ok(trades)
    }
}
