use async_trait::async_trait;
use mandi_core::{MandiError, NegotiationId, TradeId};

use crate::status::TradeStatus;
use crate::trade::{Trade, TradeDraft};

/// Persistence boundary for trades.
///
/// Implementations own two invariants the engine cannot enforce on its own:
///
/// * **One trade per negotiation.** [`TradeStore::create`] must refuse a
///   second draft for the same negotiation with a conflict, even when two
///   creations race.
/// * **Gapless yearly numbering.** The `TR-YYYY-NNNNN` sequence is allocated
///   inside the same unit of work that persists the trade, so concurrent
///   creations in one year never skip or reuse a number.
///
/// Status updates go through a compare-and-set guarded on the expected prior
/// status; a lost race surfaces as a conflict rather than a silent overwrite.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Allocates the next trade number for the draft's year and persists the
    /// finished trade atomically.
    async fn create(&self, draft: TradeDraft) -> Result<Trade, MandiError>;

    async fn fetch(&self, id: &TradeId) -> Result<Trade, MandiError>;

    async fn fetch_by_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<Trade>, MandiError>;

    /// Persists the trade if its stored status still equals `expected`.
    async fn update(&self, trade: &Trade, expected: TradeStatus) -> Result<(), MandiError>;

    /// All trades, newest trade date first.
    async fn list(&self) -> Result<Vec<Trade>, MandiError>;
}
