//! # Instant Trade Contract
//!
//! The trade aggregate born from an accepted negotiation. Commercial terms
//! (price, quantity, delivery, payment) are copied out of the negotiation at
//! creation and never change afterwards; what moves is the delivery
//! lifecycle, tracked by [`TradeStatus`] and an append-only transition log.
//!
//! ## Design Choice: Validated Enum over Typestate
//!
//! As with negotiations, the status lives as a runtime-validated enum rather
//! than a typestate parameter. Trades are loaded from storage in arbitrary
//! states and shown in mixed lists, so one concrete type with a checked
//! [`Trade::advance`] beats seven generic instantiations.
//!
//! The transition table itself lives in [`crate::status`].

use mandi_core::{CommodityDescriptor, NegotiationId, PartnerId, PartySide, Timestamp, TradeId};
use mandi_negotiation::{Actor, DeliveryTerms, PaymentTerms};
use mandi_partner::{BranchSlot, RenderedContract};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::BranchSelection;
use crate::error::TradeError;
use crate::gst::GstBreakdown;
use crate::number::TradeNumber;
use crate::status::TradeStatus;

/// One audit record in a trade's transition log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTransition {
    pub from_status: TradeStatus,
    pub to_status: TradeStatus,
    pub actor: Actor,
    pub timestamp: Timestamp,
    pub note: Option<String>,
}

/// Everything the engine decides about a new trade before the store
/// allocates its number.
///
/// The draft is handed to [`crate::store::TradeStore::create`], which
/// assigns the yearly sequence number and persists the finished trade in
/// the same unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDraft {
    pub negotiation_id: NegotiationId,
    pub buyer_partner_id: PartnerId,
    pub seller_partner_id: PartnerId,
    pub created_by: PartySide,
    pub commodity: CommodityDescriptor,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub total_amount: Decimal,
    pub ship_to: Option<BranchSelection>,
    pub bill_to: Option<BranchSelection>,
    pub ship_from: Option<BranchSelection>,
    pub tax: Option<GstBreakdown>,
    pub delivery_terms: Option<DeliveryTerms>,
    pub payment_terms: Option<PaymentTerms>,
    pub status: TradeStatus,
    pub trade_date: Timestamp,
    pub expected_delivery_date: Option<Timestamp>,
}

impl TradeDraft {
    /// Completes the draft into a trade under its allocated number.
    pub fn finalize(self, number: TradeNumber) -> Trade {
        let created = TradeTransition {
            from_status: self.status,
            to_status: self.status,
            actor: Actor::from(self.created_by),
            timestamp: self.trade_date,
            note: Some(format!("trade created from negotiation {}", self.negotiation_id)),
        };
        Trade {
            id: TradeId::new(),
            number,
            negotiation_id: self.negotiation_id,
            buyer_partner_id: self.buyer_partner_id,
            seller_partner_id: self.seller_partner_id,
            commodity: self.commodity,
            quantity: self.quantity,
            price_per_unit: self.price_per_unit,
            total_amount: self.total_amount,
            ship_to: self.ship_to,
            bill_to: self.bill_to,
            ship_from: self.ship_from,
            tax: self.tax,
            delivery_terms: self.delivery_terms,
            payment_terms: self.payment_terms,
            document: None,
            status: self.status,
            trade_date: self.trade_date,
            expected_delivery_date: self.expected_delivery_date,
            actual_delivery_date: None,
            created_at: self.trade_date,
            updated_at: self.trade_date,
            transition_log: vec![created],
        }
    }
}

/// An instant trade contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub number: TradeNumber,
    pub negotiation_id: NegotiationId,
    pub buyer_partner_id: PartnerId,
    pub seller_partner_id: PartnerId,
    pub commodity: CommodityDescriptor,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    /// Always `price_per_unit * quantity`, fixed at creation.
    pub total_amount: Decimal,
    pub ship_to: Option<BranchSelection>,
    pub bill_to: Option<BranchSelection>,
    pub ship_from: Option<BranchSelection>,
    /// Present once both shipping states are known.
    pub tax: Option<GstBreakdown>,
    pub delivery_terms: Option<DeliveryTerms>,
    pub payment_terms: Option<PaymentTerms>,
    /// Contract document, attached out of band after rendering.
    pub document: Option<RenderedContract>,
    pub status: TradeStatus,
    pub trade_date: Timestamp,
    pub expected_delivery_date: Option<Timestamp>,
    pub actual_delivery_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub transition_log: Vec<TradeTransition>,
}

impl Trade {
    /// Which side of the trade a partner stands on, if any.
    pub fn side_of(&self, partner: &PartnerId) -> Option<PartySide> {
        if partner == &self.buyer_partner_id {
            Some(PartySide::Buyer)
        } else if partner == &self.seller_partner_id {
            Some(PartySide::Seller)
        } else {
            None
        }
    }

    /// Moves the trade along one table edge.
    ///
    /// Entering `DELIVERED` stamps `actual_delivery_date` with `now` unless
    /// a date was already recorded. Failed attempts leave the trade
    /// untouched.
    pub fn advance(
        &mut self,
        to: TradeStatus,
        by: PartySide,
        now: Timestamp,
    ) -> Result<(), TradeError> {
        if self.status.is_terminal() {
            return Err(TradeError::Terminal {
                trade_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        if !self.status.can_transition_to(to) {
            return Err(TradeError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        if to == TradeStatus::Delivered && self.actual_delivery_date.is_none() {
            self.actual_delivery_date = Some(now);
        }
        self.record_transition(self.status, to, Actor::from(by), now, None);
        self.status = to;
        Ok(())
    }

    /// Attaches (or replaces) the rendered contract document.
    pub fn attach_document(&mut self, document: RenderedContract, now: Timestamp) {
        self.document = Some(document);
        self.updated_at = now;
    }

    pub fn document_ready(&self) -> bool {
        self.document.is_some()
    }

    pub fn selection_for(&self, slot: BranchSlot) -> Option<&BranchSelection> {
        match slot {
            BranchSlot::ShipTo => self.ship_to.as_ref(),
            BranchSlot::ShipFrom => self.ship_from.as_ref(),
            BranchSlot::BillTo => self.bill_to.as_ref(),
        }
    }

    /// Freezes a selection into a slot. Callers must check
    /// [`Trade::selection_for`] first; snapshots are never replaced.
    pub fn set_selection(&mut self, slot: BranchSlot, selection: BranchSelection, now: Timestamp) {
        match slot {
            BranchSlot::ShipTo => self.ship_to = Some(selection),
            BranchSlot::ShipFrom => self.ship_from = Some(selection),
            BranchSlot::BillTo => self.bill_to = Some(selection),
        }
        self.updated_at = now;
    }

    pub fn all_slots_resolved(&self) -> bool {
        self.ship_to.is_some() && self.bill_to.is_some() && self.ship_from.is_some()
    }

    fn record_transition(
        &mut self,
        from: TradeStatus,
        to: TradeStatus,
        actor: Actor,
        now: Timestamp,
        note: Option<String>,
    ) {
        self.transition_log.push(TradeTransition {
            from_status: from,
            to_status: to,
            actor,
            timestamp: now,
            note,
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandi_partner::render_stub;
    use proptest::prelude::*;

    fn t(hour: u32) -> Timestamp {
        Timestamp::parse(&format!("2026-03-10T{hour:02}:00:00Z")).unwrap()
    }

    fn sample_draft(status: TradeStatus) -> TradeDraft {
        let price = Decimal::from(5450);
        let quantity = Decimal::from(500);
        TradeDraft {
            negotiation_id: NegotiationId::new(),
            buyer_partner_id: PartnerId::new(),
            seller_partner_id: PartnerId::new(),
            created_by: PartySide::Buyer,
            commodity: CommodityDescriptor::new("COTTON", "QUINTAL"),
            quantity,
            price_per_unit: price,
            total_amount: price * quantity,
            ship_to: None,
            bill_to: None,
            ship_from: None,
            tax: None,
            delivery_terms: None,
            payment_terms: None,
            status,
            trade_date: t(9),
            expected_delivery_date: None,
        }
    }

    fn sample_trade(status: TradeStatus) -> Trade {
        sample_draft(status).finalize(TradeNumber::from_parts(2026, 1))
    }

    #[test]
    fn finalize_seeds_the_transition_log() {
        let trade = sample_trade(TradeStatus::Active);
        assert_eq!(trade.number.to_string(), "TR-2026-00001");
        assert_eq!(trade.transition_log.len(), 1);
        let first = &trade.transition_log[0];
        assert_eq!(first.from_status, TradeStatus::Active);
        assert_eq!(first.to_status, TradeStatus::Active);
        assert_eq!(first.actor, Actor::Buyer);
        assert_eq!(trade.total_amount, Decimal::from(2_725_000));
        assert!(trade.actual_delivery_date.is_none());
    }

    #[test]
    fn full_delivery_lifecycle() {
        let mut trade = sample_trade(TradeStatus::Active);
        trade.advance(TradeStatus::InTransit, PartySide::Seller, t(10)).unwrap();
        trade.advance(TradeStatus::Delivered, PartySide::Buyer, t(11)).unwrap();
        trade.advance(TradeStatus::Completed, PartySide::Buyer, t(12)).unwrap();

        assert_eq!(trade.status, TradeStatus::Completed);
        assert_eq!(trade.actual_delivery_date, Some(t(11)));
        // Creation record plus three advances.
        assert_eq!(trade.transition_log.len(), 4);
        assert_eq!(trade.updated_at, t(12));
    }

    #[test]
    fn delivered_keeps_an_existing_delivery_date() {
        let mut trade = sample_trade(TradeStatus::Active);
        trade.actual_delivery_date = Some(t(8));
        trade.advance(TradeStatus::InTransit, PartySide::Seller, t(10)).unwrap();
        trade.advance(TradeStatus::Delivered, PartySide::Buyer, t(11)).unwrap();
        assert_eq!(trade.actual_delivery_date, Some(t(8)));
    }

    #[test]
    fn invalid_edge_leaves_the_trade_unchanged() {
        let mut trade = sample_trade(TradeStatus::Active);
        let err = trade.advance(TradeStatus::Delivered, PartySide::Buyer, t(10)).unwrap_err();
        assert!(matches!(err, TradeError::InvalidTransition { .. }));
        assert_eq!(err.to_string(), "invalid transition from ACTIVE to DELIVERED");
        assert_eq!(trade.status, TradeStatus::Active);
        assert_eq!(trade.transition_log.len(), 1);
        assert_eq!(trade.updated_at, t(9));
    }

    #[test]
    fn terminal_trades_refuse_everything() {
        let mut trade = sample_trade(TradeStatus::Active);
        trade.advance(TradeStatus::Cancelled, PartySide::Buyer, t(10)).unwrap();
        let err = trade.advance(TradeStatus::Active, PartySide::Buyer, t(11)).unwrap_err();
        assert!(matches!(err, TradeError::Terminal { .. }));
        assert_eq!(trade.status, TradeStatus::Cancelled);
    }

    #[test]
    fn dispute_pauses_and_reinstates() {
        let mut trade = sample_trade(TradeStatus::Active);
        trade.advance(TradeStatus::InTransit, PartySide::Seller, t(10)).unwrap();
        trade.advance(TradeStatus::Disputed, PartySide::Buyer, t(11)).unwrap();
        trade.advance(TradeStatus::Active, PartySide::Seller, t(12)).unwrap();
        assert_eq!(trade.status, TradeStatus::Active);
        assert_eq!(trade.transition_log.len(), 4);
    }

    #[test]
    fn attach_document_overwrites_prior_attachment() {
        let mut trade = sample_trade(TradeStatus::Active);
        assert!(!trade.document_ready());

        let first = render_stub("TR-2026-00001", "draft body", t(10));
        trade.attach_document(first.clone(), t(10));
        assert!(trade.document_ready());

        let second = render_stub("TR-2026-00001", "final body", t(11));
        trade.attach_document(second.clone(), t(11));
        let doc = trade.document.as_ref().unwrap();
        assert_eq!(doc.digest, second.digest);
        assert_ne!(doc.digest, first.digest);
    }

    #[test]
    fn selections_freeze_into_slots() {
        use mandi_core::PartnerId;
        use mandi_partner::{Branch, PostalAddress};

        use crate::address::SelectionSource;

        let mut trade = sample_trade(TradeStatus::PendingBranchSelection);
        assert!(!trade.all_slots_resolved());

        let branch = Branch::new(
            PartnerId::new(),
            "Indore Depot",
            PostalAddress::new("22 Mandi Road", "Indore", "Madhya Pradesh", "452001"),
        );
        let selection = BranchSelection::new(&branch, SelectionSource::Override);
        trade.set_selection(BranchSlot::ShipTo, selection.clone(), t(10));

        assert_eq!(trade.selection_for(BranchSlot::ShipTo), Some(&selection));
        assert!(trade.selection_for(BranchSlot::ShipFrom).is_none());
        assert!(!trade.all_slots_resolved());
    }

    fn any_status() -> impl Strategy<Value = TradeStatus> {
        proptest::sample::select(TradeStatus::all().to_vec())
    }

    proptest! {
        // Random walks over the status table: successful advances use table
        // edges only, failed ones leave the trade byte-for-byte alone.
        #[test]
        fn advances_only_follow_table_edges(targets in proptest::collection::vec(any_status(), 1..40)) {
            let mut trade = sample_trade(TradeStatus::Active);
            for (step, target) in targets.into_iter().enumerate() {
                let before = trade.clone();
                let now = t(10).plus_hours(step as i64);
                match trade.advance(target, PartySide::Buyer, now) {
                    Ok(()) => {
                        prop_assert!(before.status.can_transition_to(target));
                        prop_assert!(!before.status.is_terminal());
                        prop_assert_eq!(trade.status, target);
                        prop_assert_eq!(trade.transition_log.len(), before.transition_log.len() + 1);
                        if target == TradeStatus::Delivered {
                            prop_assert!(trade.actual_delivery_date.is_some());
                        }
                    }
                    Err(_) => {
                        prop_assert_eq!(&trade, &before);
                    }
                }
            }
        }
    }
}
