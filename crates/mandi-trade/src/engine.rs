//! Trade orchestration: creation from accepted negotiations, branch
//! resolution, lifecycle advancement, and contract document attachment.

use std::fmt;
use std::sync::Arc;

use mandi_core::{BranchId, MandiError, NegotiationId, PartnerId, PartySide, Timestamp, TradeId};
use mandi_negotiation::{Negotiation, NegotiationStatus, NegotiationStore};
use mandi_partner::{
    BranchDirectory, BranchFilter, BranchSlot, CapabilityService, ContractNotifier,
    RenderedContract, RiskService, RiskVerdict, SignatureRegistry, TradeDirection,
};
use tracing::{debug, info, warn};

use crate::address::{AddressSnapshot, BranchSelection, SelectionSource};
use crate::gst::GstConfig;
use crate::status::TradeStatus;
use crate::store::TradeStore;
use crate::trade::{Trade, TradeDraft};

/// Explicit branch choices, by slot. Any slot left `None` falls back to the
/// automatic resolution rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchOverrides {
    pub ship_to: Option<BranchId>,
    pub bill_to: Option<BranchId>,
    pub ship_from: Option<BranchId>,
}

impl BranchOverrides {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Turns accepted negotiations into instant trade contracts and walks them
/// through the delivery lifecycle.
pub struct TradeEngine {
    trades: Arc<dyn TradeStore>,
    negotiations: Arc<dyn NegotiationStore>,
    branches: Arc<dyn BranchDirectory>,
    signatures: Arc<dyn SignatureRegistry>,
    capabilities: Arc<dyn CapabilityService>,
    risk: Arc<dyn RiskService>,
    notifier: Arc<dyn ContractNotifier>,
    gst: GstConfig,
}

impl TradeEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trades: Arc<dyn TradeStore>,
        negotiations: Arc<dyn NegotiationStore>,
        branches: Arc<dyn BranchDirectory>,
        signatures: Arc<dyn SignatureRegistry>,
        capabilities: Arc<dyn CapabilityService>,
        risk: Arc<dyn RiskService>,
        notifier: Arc<dyn ContractNotifier>,
        gst: GstConfig,
    ) -> Self {
        TradeEngine {
            trades,
            negotiations,
            branches,
            signatures,
            capabilities,
            risk,
            notifier,
            gst,
        }
    }

    /// Creates an instant trade contract from an accepted negotiation.
    ///
    /// Commercial terms are copied from the negotiation's final state.
    /// Branch slots resolve per the override / single-eligible / default
    /// rules; resolved addresses are frozen as snapshots and, when both
    /// shipping states are known, GST is computed and frozen with them.
    /// A trade with any unresolved slot starts in
    /// `PENDING_BRANCH_SELECTION` instead of `ACTIVE`.
    pub async fn create_trade(
        &self,
        negotiation_id: &NegotiationId,
        acting_partner: &PartnerId,
        overrides: BranchOverrides,
        now: Timestamp,
    ) -> Result<Trade, MandiError> {
        let negotiation = self.negotiations.fetch(negotiation_id).await?;
        if negotiation.status != NegotiationStatus::Accepted {
            return Err(MandiError::BusinessRule(format!(
                "negotiation {} is not accepted (status {})",
                negotiation.id, negotiation.status
            )));
        }
        let side = negotiation.side_of(acting_partner).ok_or_else(|| {
            MandiError::Authorization(format!(
                "partner {acting_partner} is not a party to negotiation {}",
                negotiation.id
            ))
        })?;
        // Friendly pre-check; the store's create is the authoritative
        // uniqueness guard when two creations race.
        if self.trades.fetch_by_negotiation(negotiation_id).await?.is_some() {
            return Err(MandiError::Conflict(format!(
                "a trade already exists for negotiation {}",
                negotiation.id
            )));
        }

        for (party, partner) in [
            (PartySide::Buyer, &negotiation.buyer_partner_id),
            (PartySide::Seller, &negotiation.seller_partner_id),
        ] {
            if !self.signatures.has_signature(partner).await? {
                return Err(MandiError::BusinessRule(format!(
                    "{party} partner {partner} has no registered signature"
                )));
            }
        }
        self.require_capability(&negotiation.buyer_partner_id, TradeDirection::Buy).await?;
        self.require_capability(&negotiation.seller_partner_id, TradeDirection::Sell).await?;
        self.require_risk_clear(&negotiation.buyer_partner_id, &negotiation, TradeDirection::Buy)
            .await?;
        self.require_risk_clear(&negotiation.seller_partner_id, &negotiation, TradeDirection::Sell)
            .await?;

        let price = negotiation.current_price.ok_or_else(|| {
            MandiError::BusinessRule(format!("negotiation {} has no agreed price", negotiation.id))
        })?;
        let quantity = negotiation.current_quantity.ok_or_else(|| {
            MandiError::BusinessRule(format!(
                "negotiation {} has no agreed quantity",
                negotiation.id
            ))
        })?;
        let total_amount = price * quantity;

        let commodity_name = negotiation.commodity.name.as_str();
        let ship_to = self
            .resolve_slot(
                &negotiation.buyer_partner_id,
                BranchSlot::ShipTo,
                overrides.ship_to.as_ref(),
                &BranchFilter::for_commodity(commodity_name),
            )
            .await?;
        let ship_from = self
            .resolve_slot(
                &negotiation.seller_partner_id,
                BranchSlot::ShipFrom,
                overrides.ship_from.as_ref(),
                &BranchFilter::for_commodity(commodity_name).with_min_capacity(quantity),
            )
            .await?;
        let bill_to = self
            .resolve_slot(
                &negotiation.buyer_partner_id,
                BranchSlot::BillTo,
                overrides.bill_to.as_ref(),
                &BranchFilter::any(),
            )
            .await?;

        let tax = match (&ship_to, &ship_from) {
            (Some(to), Some(from)) => {
                Some(self.gst.compute(total_amount, &to.snapshot.state, &from.snapshot.state))
            }
            _ => None,
        };
        let status = if ship_to.is_some() && bill_to.is_some() && ship_from.is_some() {
            TradeStatus::Active
        } else {
            TradeStatus::PendingBranchSelection
        };

        let delivery_terms = negotiation.current_terms.delivery.clone();
        let payment_terms = negotiation.current_terms.payment.clone();
        let expected_delivery_date =
            delivery_terms.as_ref().map(|terms| now.plus_days(i64::from(terms.window_days)));

        let draft = TradeDraft {
            negotiation_id: negotiation.id.clone(),
            buyer_partner_id: negotiation.buyer_partner_id.clone(),
            seller_partner_id: negotiation.seller_partner_id.clone(),
            created_by: side,
            commodity: negotiation.commodity.clone(),
            quantity,
            price_per_unit: price,
            total_amount,
            ship_to,
            bill_to,
            ship_from,
            tax,
            delivery_terms,
            payment_terms,
            status,
            trade_date: now,
            expected_delivery_date,
        };
        let trade = self.trades.create(draft).await?;

        // Contract generation is out of band. A notifier failure is logged
        // and never rolls the trade back.
        let notifier = Arc::clone(&self.notifier);
        let trade_id = trade.id.clone();
        let trade_number = trade.number.to_string();
        tokio::spawn(async move {
            if let Err(err) = notifier.contract_requested(&trade_id, &trade_number).await {
                warn!(trade = %trade_id, error = %err, "contract notification failed");
            }
        });

        info!(
            trade = %trade.id,
            number = %trade.number,
            negotiation = %trade.negotiation_id,
            status = %trade.status,
            total = %trade.total_amount,
            "trade created"
        );
        Ok(trade)
    }

    /// Moves a trade along one lifecycle edge on behalf of a party.
    pub async fn advance_status(
        &self,
        trade_id: &TradeId,
        to: TradeStatus,
        acting_partner: &PartnerId,
        now: Timestamp,
    ) -> Result<Trade, MandiError> {
        let mut trade = self.trades.fetch(trade_id).await?;
        let side = require_party(&trade, acting_partner)?;
        let expected = trade.status;
        trade.advance(to, side, now)?;
        self.trades.update(&trade, expected).await?;
        info!(trade = %trade.id, from = %expected, to = %to, by = %side, "trade status advanced");
        Ok(trade)
    }

    /// Fills unresolved branch slots on a pending trade.
    ///
    /// Explicit selections are validated like creation-time overrides;
    /// slots without one re-run the automatic rules. Already-frozen
    /// snapshots are never touched, and naming one in `selections` is a
    /// validation error. Once every slot is resolved the trade activates
    /// and GST is computed from the now-known shipping states.
    pub async fn resolve_branches(
        &self,
        trade_id: &TradeId,
        selections: BranchOverrides,
        acting_partner: &PartnerId,
        now: Timestamp,
    ) -> Result<Trade, MandiError> {
        let mut trade = self.trades.fetch(trade_id).await?;
        let side = require_party(&trade, acting_partner)?;
        if trade.status != TradeStatus::PendingBranchSelection {
            return Err(MandiError::BusinessRule(format!(
                "trade {} is not awaiting branch selection (status {})",
                trade.number, trade.status
            )));
        }
        let expected = trade.status;

        let commodity_name = trade.commodity.name.clone();
        let ship_to_filter = BranchFilter::for_commodity(commodity_name.as_str());
        let ship_from_filter =
            BranchFilter::for_commodity(commodity_name.as_str()).with_min_capacity(trade.quantity);
        let bill_to_filter = BranchFilter::any();
        self.fill_slot(&mut trade, BranchSlot::ShipTo, selections.ship_to.as_ref(), &ship_to_filter, now)
            .await?;
        self.fill_slot(
            &mut trade,
            BranchSlot::ShipFrom,
            selections.ship_from.as_ref(),
            &ship_from_filter,
            now,
        )
        .await?;
        self.fill_slot(&mut trade, BranchSlot::BillTo, selections.bill_to.as_ref(), &bill_to_filter, now)
            .await?;

        if trade.all_slots_resolved() {
            let shipping_states = trade
                .ship_to
                .as_ref()
                .zip(trade.ship_from.as_ref())
                .map(|(to, from)| (to.snapshot.state.clone(), from.snapshot.state.clone()));
            if let Some((to_state, from_state)) = shipping_states {
                if trade.tax.is_none() {
                    trade.tax = Some(self.gst.compute(trade.total_amount, &to_state, &from_state));
                }
                trade.advance(TradeStatus::Active, side, now)?;
            }
        }
        self.trades.update(&trade, expected).await?;
        info!(
            trade = %trade.id,
            number = %trade.number,
            status = %trade.status,
            "branch slots resolved"
        );
        Ok(trade)
    }

    /// Attaches a rendered contract document, replacing any prior one.
    /// Renderers call this out of band and may retry freely.
    pub async fn attach_document(
        &self,
        trade_id: &TradeId,
        document: RenderedContract,
        now: Timestamp,
    ) -> Result<Trade, MandiError> {
        let mut trade = self.trades.fetch(trade_id).await?;
        let expected = trade.status;
        trade.attach_document(document, now);
        self.trades.update(&trade, expected).await?;
        debug!(trade = %trade.id, number = %trade.number, "contract document attached");
        Ok(trade)
    }

    /// Whether the trade's contract document has been attached yet.
    pub async fn document_ready(&self, trade_id: &TradeId) -> Result<bool, MandiError> {
        Ok(self.trades.fetch(trade_id).await?.document_ready())
    }

    pub async fn trade(&self, trade_id: &TradeId) -> Result<Trade, MandiError> {
        self.trades.fetch(trade_id).await
    }

    pub async fn trade_by_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<Trade>, MandiError> {
        self.trades.fetch_by_negotiation(negotiation_id).await
    }

    pub async fn trades(&self) -> Result<Vec<Trade>, MandiError> {
        self.trades.list().await
    }

    // ── Resolution rules ─────────────────────────────────────────────────

    /// Resolves one slot: explicit override, else sole eligible branch,
    /// else the partner's default among the eligible set, else unresolved.
    async fn resolve_slot(
        &self,
        partner: &PartnerId,
        slot: BranchSlot,
        override_id: Option<&BranchId>,
        filter: &BranchFilter,
    ) -> Result<Option<BranchSelection>, MandiError> {
        if let Some(id) = override_id {
            let branch = match self.branches.branch(id).await {
                Ok(branch) => branch,
                Err(MandiError::NotFound { .. }) => {
                    return Err(MandiError::Validation(format!(
                        "override branch {id} for {slot} does not exist"
                    )));
                }
                Err(other) => return Err(other),
            };
            if &branch.partner_id != partner {
                return Err(MandiError::Validation(format!(
                    "override branch {id} for {slot} does not belong to partner {partner}"
                )));
            }
            return Ok(Some(BranchSelection {
                snapshot: AddressSnapshot::from_branch(&branch),
                source: SelectionSource::Override,
            }));
        }

        let eligible = self.branches.eligible(partner, filter).await?;
        match eligible.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(BranchSelection {
                snapshot: AddressSnapshot::from_branch(only),
                source: SelectionSource::SingleEligible,
            })),
            many => Ok(many.iter().find(|branch| branch.is_default_for(slot)).map(|branch| {
                BranchSelection {
                    snapshot: AddressSnapshot::from_branch(branch),
                    source: SelectionSource::PartnerDefault,
                }
            })),
        }
    }

    async fn fill_slot(
        &self,
        trade: &mut Trade,
        slot: BranchSlot,
        explicit: Option<&BranchId>,
        filter: &BranchFilter,
        now: Timestamp,
    ) -> Result<(), MandiError> {
        if trade.selection_for(slot).is_some() {
            if explicit.is_some() {
                return Err(MandiError::Validation(format!(
                    "{slot} address on trade {} is already frozen",
                    trade.number
                )));
            }
            return Ok(());
        }
        let partner = match slot {
            BranchSlot::ShipTo | BranchSlot::BillTo => trade.buyer_partner_id.clone(),
            BranchSlot::ShipFrom => trade.seller_partner_id.clone(),
        };
        if let Some(selection) = self.resolve_slot(&partner, slot, explicit, filter).await? {
            trade.set_selection(slot, selection, now);
        }
        Ok(())
    }

    // ── Collaborator gates ───────────────────────────────────────────────

    async fn require_capability(
        &self,
        partner: &PartnerId,
        direction: TradeDirection,
    ) -> Result<(), MandiError> {
        let decision = self.capabilities.check(partner, direction).await?;
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| format!("partner {partner} is not permitted to {direction}"));
            return Err(MandiError::Authorization(reason));
        }
        Ok(())
    }

    async fn require_risk_clear(
        &self,
        partner: &PartnerId,
        negotiation: &Negotiation,
        direction: TradeDirection,
    ) -> Result<(), MandiError> {
        let assessment = self.risk.assess(partner, &negotiation.commodity, direction).await?;
        if assessment.is_blocking() {
            let detail = assessment.detail.unwrap_or_else(|| "no detail given".to_string());
            return Err(MandiError::BusinessRule(format!(
                "risk screening failed for partner {partner}: {detail}"
            )));
        }
        if assessment.verdict == RiskVerdict::Warn {
            warn!(
                partner = %partner,
                detail = assessment.detail.as_deref().unwrap_or(""),
                "risk screening warned during trade creation"
            );
        }
        Ok(())
    }
}

fn require_party(trade: &Trade, partner: &PartnerId) -> Result<PartySide, MandiError> {
    trade.side_of(partner).ok_or_else(|| {
        MandiError::Authorization(format!(
            "partner {partner} is not a party to trade {}",
            trade.number
        ))
    })
}

impl fmt::Debug for TradeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradeEngine").finish_non_exhaustive()
    }
}
