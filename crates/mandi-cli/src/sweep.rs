//! # Sweep Subcommand
//!
//! Expires every live negotiation whose 48-hour window has passed.
//! Meant to run on a schedule (cron or a systemd timer); a second run
//! over the same instant is a no-op.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use mandi_core::Timestamp;
use mandi_match::MatchTokenManager;
use mandi_negotiation::NegotiationEngine;
use mandi_partner::{StaticCapabilityService, StaticRiskService};
use mandi_store::{init_pool, PgStore};

/// Arguments for the `mandi sweep` subcommand.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Sweep instant as ISO-8601 UTC ("2026-01-01T00:00:00Z").
    /// Defaults to now. Useful for replaying a missed schedule slot.
    #[arg(long)]
    pub at: Option<String>,
}

/// Execute the sweep.
pub async fn run_sweep(args: &SweepArgs) -> Result<u8> {
    let now = match &args.at {
        Some(text) => Timestamp::parse(text)?,
        None => Timestamp::now(),
    };

    let pool = init_pool()
        .await?
        .context("DATABASE_URL is not set; the sweep needs a database")?;
    let store = Arc::new(PgStore::new(pool));
    let tokens = Arc::new(MatchTokenManager::new(store.clone()));
    let engine = NegotiationEngine::new(
        store,
        tokens,
        Arc::new(StaticCapabilityService::new()),
        Arc::new(StaticRiskService::new()),
    );

    let expired = engine.expire_sweep(now).await?;
    println!("Expired {expired} negotiation(s) as of {now}.");
    Ok(0)
}
