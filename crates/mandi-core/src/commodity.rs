//! # Commodity Descriptor
//!
//! Names what a pairing trades: the commodity, an optional variety, and
//! the unit quantities are denominated in. The descriptor is copied from
//! the match token into the negotiation and from there into the trade,
//! so downstream records can name the goods without consulting the
//! external requirement/availability services.

use serde::{Deserialize, Serialize};

/// The commodity a pairing trades, as carried on tokens, negotiations,
/// and trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityDescriptor {
    /// Commodity name, e.g. `COTTON`.
    pub name: String,
    /// Optional variety, e.g. `Shankar-6`.
    pub variety: Option<String>,
    /// Unit of measure quantities are denominated in, e.g. `MT`.
    pub unit: String,
}

impl CommodityDescriptor {
    /// Descriptor without a variety.
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variety: None,
            unit: unit.into(),
        }
    }

    /// Attach a variety to the descriptor.
    pub fn with_variety(mut self, variety: impl Into<String>) -> Self {
        self.variety = Some(variety.into());
        self
    }
}

impl std::fmt::Display for CommodityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.variety {
            Some(variety) => write!(f, "{} ({variety})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_variety() {
        let c = CommodityDescriptor::new("COTTON", "MT");
        assert_eq!(c.to_string(), "COTTON");
    }

    #[test]
    fn display_with_variety() {
        let c = CommodityDescriptor::new("COTTON", "MT").with_variety("Shankar-6");
        assert_eq!(c.to_string(), "COTTON (Shankar-6)");
    }
}
