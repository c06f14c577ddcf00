//! # Negotiation Store Contract
//!
//! Persistence boundary for negotiations and their offer and message
//! logs. Implementations live in `mandi-store` (in-memory and
//! Postgres); the engine only sees this trait.
//!
//! The composite commands (`append_offer`, `finalize`, `expire`) are
//! where the concurrency contracts live: each re-reads the persisted
//! negotiation under an exclusive lock, re-validates through the
//! aggregate, and commits every produced record in one atomic unit. Two
//! racing writers: one commits, the other sees the aggregate's error or
//! a `Conflict`.

use async_trait::async_trait;

use mandi_core::{MandiError, NegotiationId, PartySide, Timestamp};
use mandi_match::TokenCode;

use crate::message::NegotiationMessage;
use crate::negotiation::Negotiation;
use crate::offer::{NegotiationOffer, OfferProposal};

/// How the previous pending offer is resolved when a new one lands.
#[derive(Debug, Clone)]
pub enum PriorOfferDisposition {
    /// Plain counter: the prior offer becomes `COUNTERED`.
    Counter,
    /// Explicit reject-with-counter: the prior offer becomes `REJECTED`
    /// with the stated reason.
    Reject { reason: String },
}

/// The terminal decision applied by [`NegotiationStore::finalize`].
#[derive(Debug, Clone)]
pub enum FinalDecision {
    /// Accept the latest offer.
    Accept { message: Option<String> },
    /// Reject the latest offer without countering.
    Reject { reason: String },
}

/// Persistence contract for negotiations, offers, and messages.
///
/// Offers and messages are append-only audit records: nothing in this
/// contract deletes them, and implementations must forbid deleting a
/// negotiation that has offers.
#[async_trait]
pub trait NegotiationStore: Send + Sync {
    /// Insert a freshly started negotiation.
    ///
    /// # Errors
    ///
    /// `Conflict` if a negotiation already exists for the same token
    /// code (at most one per token, enforced here and not by callers).
    async fn insert(&self, negotiation: &Negotiation) -> Result<(), MandiError>;

    /// Fetch a negotiation by id.
    ///
    /// # Errors
    ///
    /// `NotFound` if no negotiation has this id.
    async fn fetch(&self, id: &NegotiationId) -> Result<Negotiation, MandiError>;

    /// The negotiation started from `code`, if any.
    async fn fetch_by_token(&self, code: &TokenCode)
        -> Result<Option<Negotiation>, MandiError>;

    /// Atomically validate and append the next offer.
    ///
    /// In one unit: re-reads the negotiation under an exclusive lock,
    /// applies the aggregate's turn/liveness/alternation checks,
    /// resolves the prior pending offer per `disposition`, inserts the
    /// new offer, and persists the updated negotiation.
    ///
    /// # Errors
    ///
    /// The aggregate's errors mapped into the taxonomy (`BusinessRule`,
    /// `Expired`), `NotFound` for an unknown id, `Conflict` when a
    /// racing writer got there first.
    async fn append_offer(
        &self,
        id: &NegotiationId,
        by: PartySide,
        proposal: OfferProposal,
        disposition: PriorOfferDisposition,
        now: Timestamp,
    ) -> Result<NegotiationOffer, MandiError>;

    /// Atomically apply a terminal accept or reject.
    ///
    /// In one unit: re-validates through the aggregate, resolves the
    /// latest offer (`ACCEPTED` or `REJECTED`) with the response
    /// message, appends the response chat line when one is present, and
    /// persists the terminal negotiation. The persisted write is
    /// guarded on the prior status.
    async fn finalize(
        &self,
        id: &NegotiationId,
        by: PartySide,
        decision: FinalDecision,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError>;

    /// Atomically expire one negotiation past its window.
    ///
    /// In one unit: transitions the negotiation to `EXPIRED`, marks a
    /// still-pending latest offer `EXPIRED`, and appends the system
    /// audit line.
    async fn expire(
        &self,
        id: &NegotiationId,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError>;

    /// Live negotiations whose expiry time has passed: the sweep's
    /// candidate list.
    async fn expirable(&self, now: Timestamp) -> Result<Vec<Negotiation>, MandiError>;

    /// All offers of a negotiation, ordered by round number.
    async fn offers_for(
        &self,
        id: &NegotiationId,
    ) -> Result<Vec<NegotiationOffer>, MandiError>;

    /// The highest-round offer, if any offer exists.
    async fn latest_offer(
        &self,
        id: &NegotiationId,
    ) -> Result<Option<NegotiationOffer>, MandiError>;

    /// Append one chat/audit line.
    ///
    /// # Errors
    ///
    /// `NotFound` if the referenced negotiation does not exist.
    async fn append_message(&self, message: &NegotiationMessage) -> Result<(), MandiError>;

    /// All messages of a negotiation, in send order.
    async fn messages_for(
        &self,
        id: &NegotiationId,
    ) -> Result<Vec<NegotiationMessage>, MandiError>;
}
