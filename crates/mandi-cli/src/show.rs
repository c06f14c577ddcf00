//! # Show Subcommand
//!
//! Read-only inspection of negotiations and trades in the database.
//! Line output for humans, `--json` for scripts.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use mandi_core::{NegotiationId, TradeId};
use mandi_negotiation::NegotiationStore;
use mandi_store::{init_pool, PgStore};
use mandi_trade::TradeStore;

/// Arguments for the `mandi show` subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(subcommand)]
    pub command: ShowCommand,
}

/// Show subcommands.
#[derive(Subcommand, Debug)]
pub enum ShowCommand {
    /// Show one negotiation with its offers and messages.
    Negotiation {
        /// Negotiation id, with or without the "negotiation:" prefix.
        #[arg(long)]
        id: String,
        /// Emit the raw record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one trade contract.
    Trade {
        /// Trade id, with or without the "trade:" prefix.
        #[arg(long)]
        id: String,
        /// Emit the raw record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List all trades, newest first.
    Trades {
        /// Emit the raw records as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Execute the show subcommand.
pub async fn run_show(args: &ShowArgs) -> Result<u8> {
    let pool = init_pool()
        .await?
        .context("DATABASE_URL is not set; show reads from the database")?;
    let store = PgStore::new(pool);

    match &args.command {
        ShowCommand::Negotiation { id, json } => {
            cmd_negotiation(&store, id, *json).await
        }
        ShowCommand::Trade { id, json } => cmd_trade(&store, id, *json).await,
        ShowCommand::Trades { json } => cmd_trades(&store, *json).await,
    }
}

async fn cmd_negotiation(store: &PgStore, id: &str, json: bool) -> Result<u8> {
    let id = NegotiationId(parse_uuid(id, "negotiation")?);
    let negotiation = NegotiationStore::fetch(store, &id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&negotiation)?);
        return Ok(0);
    }

    println!("Negotiation: {}", negotiation.id);
    println!("  Token: {}", negotiation.token_code);
    println!("  Status: {}", negotiation.status);
    println!("  Commodity: {}", negotiation.commodity);
    println!("  Round: {}", negotiation.current_round);
    match (negotiation.current_price, negotiation.current_quantity) {
        (Some(price), Some(quantity)) => println!("  On the table: {price} x {quantity}"),
        _ => println!("  On the table: nothing yet"),
    }
    println!("  Initiated: {} by {}", negotiation.initiated_at, negotiation.initiated_by);
    println!("  Expires: {}", negotiation.expires_at);

    let offers = store.offers_for(&id).await?;
    println!("  Offers: {}", offers.len());
    for offer in &offers {
        println!(
            "    [{}] {} {} x {} ({})",
            offer.round_number, offer.offered_by, offer.price_per_unit, offer.quantity,
            offer.status
        );
    }
    let messages = store.messages_for(&id).await?;
    println!("  Messages: {}", messages.len());
    for message in &messages {
        println!("    {} {}: {}", message.sent_at, message.author, message.body);
    }
    Ok(0)
}

async fn cmd_trade(store: &PgStore, id: &str, json: bool) -> Result<u8> {
    let id = TradeId(parse_uuid(id, "trade")?);
    let trade = TradeStore::fetch(store, &id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&trade)?);
        return Ok(0);
    }

    println!("Trade: {}", trade.number);
    println!("  Id: {}", trade.id);
    println!("  Status: {}", trade.status);
    println!("  Negotiation: {}", trade.negotiation_id);
    println!("  Commodity: {}", trade.commodity);
    println!(
        "  Terms: {} x {} = {}",
        trade.price_per_unit, trade.quantity, trade.total_amount
    );
    if let Some(tax) = &trade.tax {
        println!("  GST ({}): {}", tax.gst_type, tax.total_tax);
    } else {
        println!("  GST: pending branch selection");
    }
    for (label, selection) in [
        ("Ship to", &trade.ship_to),
        ("Ship from", &trade.ship_from),
        ("Bill to", &trade.bill_to),
    ] {
        match selection {
            Some(selection) => println!("  {label}: {}", selection.snapshot),
            None => println!("  {label}: unresolved"),
        }
    }
    match &trade.document {
        Some(document) => println!("  Contract: {}", document.url),
        None => println!("  Contract: not attached"),
    }
    if let Some(expected) = trade.expected_delivery_date {
        println!("  Expected delivery: {expected}");
    }
    println!("  Transitions: {}", trade.transition_log.len());
    for (i, t) in trade.transition_log.iter().enumerate() {
        println!(
            "    [{i}] {} → {} at {}",
            t.from_status, t.to_status, t.timestamp
        );
    }
    Ok(0)
}

async fn cmd_trades(store: &PgStore, json: bool) -> Result<u8> {
    let trades = store.list().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&trades)?);
        return Ok(0);
    }
    if trades.is_empty() {
        println!("No trades found.");
        return Ok(0);
    }
    for trade in &trades {
        println!(
            "{}  {:<24}  {:>14}  {}",
            trade.number,
            trade.status.as_str(),
            trade.total_amount.to_string(),
            trade.trade_date
        );
    }
    Ok(0)
}

/// Accepts both the bare UUID and the prefixed display form.
fn parse_uuid(input: &str, kind: &str) -> Result<Uuid> {
    let bare = input
        .strip_prefix(kind)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(input);
    Uuid::parse_str(bare).with_context(|| format!("invalid {kind} id: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_accepts_bare_and_prefixed_forms() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string(), "trade").unwrap(), id);
        assert_eq!(parse_uuid(&format!("trade:{id}"), "trade").unwrap(), id);
        assert!(parse_uuid("not-a-uuid", "trade").is_err());
        // A foreign prefix does not strip.
        assert!(parse_uuid(&format!("negotiation:{id}"), "trade").is_err());
    }
}
