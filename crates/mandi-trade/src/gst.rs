//! GST computation for trade contracts.
//!
//! Indian goods-and-services tax splits by geography: an intra-state trade
//! levies CGST + SGST in equal halves, an inter-state trade levies a single
//! IGST component. Which case applies is decided by comparing the ship-to
//! and ship-from branch states, so a breakdown can only be produced once
//! both addresses are frozen on the trade.

use mandi_core::MandiError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic classification of a trade for GST purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GstType {
    IntraState,
    InterState,
}

impl GstType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GstType::IntraState => "INTRA_STATE",
            GstType::InterState => "INTER_STATE",
        }
    }

    /// Classifies by state name, ignoring case and surrounding whitespace.
    pub fn classify(ship_to_state: &str, ship_from_state: &str) -> GstType {
        if normalize(ship_to_state) == normalize(ship_from_state) {
            GstType::IntraState
        } else {
            GstType::InterState
        }
    }
}

impl fmt::Display for GstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(state: &str) -> String {
    state.trim().to_uppercase()
}

/// One levy line within a breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComponent {
    pub name: String,
    pub rate_percent: Decimal,
    pub amount: Decimal,
}

/// Computed tax for a trade, frozen alongside the address snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub gst_type: GstType,
    pub taxable_amount: Decimal,
    pub components: Vec<TaxComponent>,
    pub total_tax: Decimal,
}

impl GstBreakdown {
    pub fn total_with_tax(&self) -> Decimal {
        self.taxable_amount + self.total_tax
    }
}

/// A named rate, e.g. CGST at 9%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRate {
    pub name: String,
    pub rate_percent: Decimal,
}

/// Configurable GST rate schedule.
///
/// Deserialized from YAML so deployments can track rate notifications
/// without a code change:
///
/// ```yaml
/// intra_state:
///   - name: CGST
///     rate_percent: 9
///   - name: SGST
///     rate_percent: 9
/// inter_state:
///   name: IGST
///   rate_percent: 18
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstConfig {
    pub intra_state: Vec<ComponentRate>,
    pub inter_state: ComponentRate,
}

impl Default for GstConfig {
    fn default() -> Self {
        GstConfig {
            intra_state: vec![
                ComponentRate { name: "CGST".to_string(), rate_percent: Decimal::from(9) },
                ComponentRate { name: "SGST".to_string(), rate_percent: Decimal::from(9) },
            ],
            inter_state: ComponentRate { name: "IGST".to_string(), rate_percent: Decimal::from(18) },
        }
    }
}

impl GstConfig {
    pub fn from_yaml(text: &str) -> Result<Self, MandiError> {
        serde_yaml::from_str(text)
            .map_err(|err| MandiError::Validation(format!("invalid gst config: {err}")))
    }

    /// Computes the breakdown for a taxable amount. Component amounts round
    /// to two decimal places, half away from zero.
    pub fn compute(
        &self,
        taxable_amount: Decimal,
        ship_to_state: &str,
        ship_from_state: &str,
    ) -> GstBreakdown {
        let gst_type = GstType::classify(ship_to_state, ship_from_state);
        let rates: Vec<&ComponentRate> = match gst_type {
            GstType::IntraState => self.intra_state.iter().collect(),
            GstType::InterState => vec![&self.inter_state],
        };
        let hundred = Decimal::from(100);
        let components: Vec<TaxComponent> = rates
            .into_iter()
            .map(|rate| TaxComponent {
                name: rate.name.clone(),
                rate_percent: rate.rate_percent,
                amount: (taxable_amount * rate.rate_percent / hundred)
                    .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero),
            })
            .collect();
        let total_tax = components.iter().map(|c| c.amount).sum();
        GstBreakdown { gst_type, taxable_amount, components, total_tax }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_state_splits_into_cgst_and_sgst() {
        let config = GstConfig::default();
        let breakdown = config.compute(
            Decimal::from_str_exact("2725000").unwrap(),
            "Maharashtra",
            "Maharashtra",
        );
        assert_eq!(breakdown.gst_type, GstType::IntraState);
        assert_eq!(breakdown.components.len(), 2);
        assert_eq!(breakdown.components[0].name, "CGST");
        assert_eq!(breakdown.components[0].amount, Decimal::from_str_exact("245250").unwrap());
        assert_eq!(breakdown.components[1].name, "SGST");
        assert_eq!(breakdown.components[1].amount, Decimal::from_str_exact("245250").unwrap());
        assert_eq!(breakdown.total_tax, Decimal::from_str_exact("490500").unwrap());
        assert_eq!(
            breakdown.total_with_tax(),
            Decimal::from_str_exact("3215500").unwrap()
        );
    }

    #[test]
    fn different_states_levy_single_igst() {
        let config = GstConfig::default();
        let breakdown = config.compute(
            Decimal::from_str_exact("2725000").unwrap(),
            "Maharashtra",
            "Gujarat",
        );
        assert_eq!(breakdown.gst_type, GstType::InterState);
        assert_eq!(breakdown.components.len(), 1);
        assert_eq!(breakdown.components[0].name, "IGST");
        assert_eq!(
            breakdown.components[0].rate_percent,
            Decimal::from_str_exact("18").unwrap()
        );
        assert_eq!(breakdown.total_tax, Decimal::from_str_exact("490500").unwrap());
    }

    #[test]
    fn state_comparison_ignores_case_and_whitespace() {
        assert_eq!(GstType::classify(" maharashtra ", "MAHARASHTRA"), GstType::IntraState);
        assert_eq!(GstType::classify("Gujarat", "gujarat "), GstType::IntraState);
        assert_eq!(GstType::classify("Punjab", "Haryana"), GstType::InterState);
    }

    #[test]
    fn component_amounts_round_to_paise() {
        let config = GstConfig::default();
        let breakdown = config.compute(
            Decimal::from_str_exact("100.10").unwrap(),
            "Karnataka",
            "Karnataka",
        );
        // 100.10 * 9% = 9.009, rounded to 9.01 per component.
        assert_eq!(breakdown.components[0].amount, Decimal::from_str_exact("9.01").unwrap());
        assert_eq!(breakdown.total_tax, Decimal::from_str_exact("18.02").unwrap());
    }

    #[test]
    fn parses_rate_schedule_from_yaml() {
        let yaml = r#"
intra_state:
  - name: CGST
    rate_percent: 6
  - name: SGST
    rate_percent: 6
inter_state:
  name: IGST
  rate_percent: 12
"#;
        let config = GstConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.intra_state.len(), 2);
        assert_eq!(config.inter_state.rate_percent, Decimal::from(12));
        let breakdown = config.compute(Decimal::from(1000), "Kerala", "Tamil Nadu");
        assert_eq!(breakdown.total_tax, Decimal::from(120));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = GstConfig::from_yaml("intra_state: 12").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
