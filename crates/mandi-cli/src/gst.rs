//! # GST Subcommand
//!
//! Computes a GST breakdown for a taxable amount and a destination /
//! origin state pair, using either the standard rate schedule or a
//! YAML rate file of the same shape the trade engine loads.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;

use mandi_trade::GstConfig;

/// Arguments for the `mandi gst` subcommand.
#[derive(Args, Debug)]
pub struct GstArgs {
    /// Taxable amount.
    #[arg(long)]
    pub amount: Decimal,

    /// Destination (ship-to) state.
    #[arg(long)]
    pub to_state: String,

    /// Origin (ship-from) state.
    #[arg(long)]
    pub from_state: String,

    /// YAML rate configuration. Defaults to the standard schedule
    /// (CGST 9 + SGST 9 within a state, IGST 18 across states).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute the GST calculation.
pub fn run_gst(args: &GstArgs) -> Result<u8> {
    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            GstConfig::from_yaml(&text)?
        }
        None => GstConfig::default(),
    };

    let breakdown = config.compute(args.amount, &args.to_state, &args.from_state);
    println!("GST type: {}", breakdown.gst_type);
    println!("Taxable: {}", breakdown.taxable_amount);
    for component in &breakdown.components {
        println!(
            "  {} @ {}%: {}",
            component.name, component.rate_percent, component.amount
        );
    }
    println!("Total tax: {}", breakdown.total_tax);
    println!("Payable: {}", breakdown.total_with_tax());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_computes() {
        let args = GstArgs {
            amount: Decimal::from(100_000),
            to_state: "Maharashtra".to_string(),
            from_state: "Gujarat".to_string(),
            config: None,
        };
        assert_eq!(run_gst(&args).unwrap(), 0);
    }

    #[test]
    fn missing_config_file_errors() {
        let args = GstArgs {
            amount: Decimal::from(1),
            to_state: "Maharashtra".to_string(),
            from_state: "Maharashtra".to_string(),
            config: Some(PathBuf::from("/nonexistent/rates.yaml")),
        };
        assert!(run_gst(&args).is_err());
    }
}
