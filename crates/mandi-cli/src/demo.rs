//! # Demo Subcommand
//!
//! Runs the whole pipeline against the in-memory store: issue a match
//! token, negotiate to acceptance, create the instant trade contract,
//! attach the rendered document, and walk delivery to completion. Every
//! step prints what a caller of the engines would see.
//!
//! Nothing touches the database; the run is self-contained and leaves
//! no state behind.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use rust_decimal::Decimal;

use mandi_core::{AvailabilityId, CommodityDescriptor, PartnerId, RequirementId, Timestamp};
use mandi_match::{MatchPairing, MatchTokenManager};
use mandi_negotiation::{
    DeliveryTerms, NegotiationEngine, OfferProposal, OfferTerms, PaymentTerms, StartOptions,
};
use mandi_partner::{
    render_stub, Branch, InMemoryBranchDirectory, InMemorySignatureRegistry, PostalAddress,
    RecordingNotifier, StaticCapabilityService, StaticRiskService, TradingCapabilities,
};
use mandi_store::MemoryStore;
use mandi_trade::{BranchOverrides, GstConfig, TradeEngine, TradeStatus};

/// Arguments for the `mandi demo` subcommand.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// State of the seller's dispatch branch. The buyer ships to
    /// Maharashtra, so anything else exercises the inter-state path.
    #[arg(long, default_value = "Gujarat")]
    pub seller_state: String,

    /// The buyer's opening price per quintal.
    #[arg(long, default_value = "5400")]
    pub opening_price: Decimal,

    /// The seller's counter price, which the buyer accepts.
    #[arg(long, default_value = "5450")]
    pub counter_price: Decimal,

    /// Quantity in quintals.
    #[arg(long, default_value = "500")]
    pub quantity: Decimal,
}

/// Execute the demo scenario.
pub async fn run_demo(args: &DemoArgs) -> Result<u8> {
    let store = Arc::new(MemoryStore::new());
    let branches = Arc::new(InMemoryBranchDirectory::new());
    let signatures = Arc::new(InMemorySignatureRegistry::new());
    let capabilities = Arc::new(StaticCapabilityService::new());
    let risk = Arc::new(StaticRiskService::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let tokens = Arc::new(MatchTokenManager::new(store.clone()));

    let buyer = PartnerId::new();
    let seller = PartnerId::new();
    capabilities.register(buyer.clone(), TradingCapabilities::domestic());
    capabilities.register(seller.clone(), TradingCapabilities::domestic());
    signatures.register(buyer.clone());
    signatures.register(seller.clone());

    branches.register(
        Branch::new(
            buyer.clone(),
            "Pune Depot",
            PostalAddress::new("Plot 14, Market Yard", "Pune", "Maharashtra", "411037"),
        )
        .with_commodities(vec!["Wheat".to_string()]),
    );
    branches.register(
        Branch::new(
            seller.clone(),
            "Dispatch Yard",
            PostalAddress::new("Gate 2, APMC Road", "Rajkot", args.seller_state.clone(), "360001"),
        )
        .with_commodities(vec!["Wheat".to_string()])
        .with_capacity(args.quantity * Decimal::from(2)),
    );

    let negotiation_engine = NegotiationEngine::new(
        store.clone(),
        tokens.clone(),
        capabilities.clone(),
        risk.clone(),
    );
    let trade_engine = TradeEngine::new(
        store.clone(),
        store.clone(),
        branches,
        signatures,
        capabilities,
        risk,
        notifier,
        GstConfig::default(),
    );

    let now = Timestamp::now();
    let pairing = MatchPairing {
        requirement_id: RequirementId::new(),
        availability_id: AvailabilityId::new(),
        buyer_partner_id: buyer.clone(),
        seller_partner_id: seller.clone(),
        commodity: CommodityDescriptor::new("Wheat", "quintal").with_variety("Sharbati"),
        match_score: 0.92,
    };
    let token = tokens.issue(pairing, now).await?;
    println!("Match token issued: {}", token.code);
    println!("  Commodity: {}", token.commodity);
    println!("  Expires: {}", token.expires_at);

    let negotiation = negotiation_engine
        .start(
            &token.code,
            &buyer,
            StartOptions::default().with_initial_message("need delivery within a week"),
            now,
        )
        .await?;
    println!("Negotiation started: {}", negotiation.id);

    let terms = OfferTerms {
        delivery: Some(DeliveryTerms {
            location: "FOR Pune".to_string(),
            window_days: 7,
        }),
        payment: Some(PaymentTerms {
            method: "RTGS".to_string(),
            due_within_days: 3,
            advance_percent: None,
        }),
        quality: None,
    };
    let offer = negotiation_engine
        .make_offer(
            &negotiation.id,
            &buyer,
            OfferProposal::new(args.opening_price, args.quantity).with_terms(terms.clone()),
            now.plus_hours(1),
        )
        .await?;
    println!(
        "  [round {}] BUYER offers {} x {}",
        offer.round_number, offer.price_per_unit, offer.quantity
    );
    let counter = negotiation_engine
        .make_offer(
            &negotiation.id,
            &seller,
            OfferProposal::new(args.counter_price, args.quantity).with_terms(terms),
            now.plus_hours(2),
        )
        .await?;
    println!(
        "  [round {}] SELLER counters {} x {}",
        counter.round_number, counter.price_per_unit, counter.quantity
    );
    let accepted = negotiation_engine
        .accept(
            &negotiation.id,
            &buyer,
            Some(format!("done at {}", args.counter_price)),
            now.plus_hours(3),
        )
        .await?;
    println!("  BUYER accepts at round {}", accepted.current_round);

    let trade = trade_engine
        .create_trade(&accepted.id, &buyer, BranchOverrides::none(), now.plus_hours(4))
        .await?;
    println!("Trade created: {} ({})", trade.number, trade.status);
    println!("  Total: {}", trade.total_amount);
    if let Some(tax) = &trade.tax {
        println!("  GST ({}):", tax.gst_type);
        for component in &tax.components {
            println!(
                "    {} @ {}%: {}",
                component.name, component.rate_percent, component.amount
            );
        }
        println!("  Payable: {}", tax.total_with_tax());
    }
    if let (Some(to), Some(from)) = (&trade.ship_to, &trade.ship_from) {
        println!("  Ship to: {}", to.snapshot);
        println!("  Ship from: {}", from.snapshot);
    }

    let document = render_stub(
        &trade.number.to_string(),
        "instant trade contract",
        now.plus_hours(5),
    );
    let with_document = trade_engine
        .attach_document(&trade.id, document, now.plus_hours(5))
        .await?;
    if let Some(document) = &with_document.document {
        println!("Contract attached: {} ({})", document.url, document.digest);
    }

    for (to, by, at) in [
        (TradeStatus::InTransit, &seller, now.plus_days(1)),
        (TradeStatus::Delivered, &buyer, now.plus_days(6)),
        (TradeStatus::Completed, &buyer, now.plus_days(7)),
    ] {
        let advanced = trade_engine.advance_status(&trade.id, to, by, at).await?;
        println!("Trade {}: {}", advanced.number, advanced.status);
    }

    println!("Demo complete.");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_scenario_completes() {
        let args = DemoArgs {
            seller_state: "Gujarat".to_string(),
            opening_price: Decimal::from(5_400),
            counter_price: Decimal::from(5_450),
            quantity: Decimal::from(500),
        };
        assert_eq!(run_demo(&args).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn demo_intra_state_scenario_completes() {
        let args = DemoArgs {
            seller_state: "Maharashtra".to_string(),
            opening_price: Decimal::from(2_000),
            counter_price: Decimal::from(2_050),
            quantity: Decimal::from(100),
        };
        assert_eq!(run_demo(&args).await.unwrap(), 0);
    }
}
