//! # Trading Capabilities
//!
//! Answers "may this partner buy/sell?" ahead of negotiation and trade
//! actions. Capabilities are a **closed record of named booleans**, not
//! a key/value map: a missing or misspelled capability is a compile
//! error here, never a silent runtime `false`.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use mandi_core::{MandiError, PartnerId, PartySide};

/// The direction of a trade action from one partner's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDirection {
    /// Acquiring goods (the requirement side).
    Buy,
    /// Supplying goods (the availability side).
    Sell,
}

impl TradeDirection {
    /// The canonical string name of this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl From<PartySide> for TradeDirection {
    fn from(side: PartySide) -> Self {
        match side {
            PartySide::Buyer => Self::Buy,
            PartySide::Seller => Self::Sell,
        }
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partner's trading permissions as a closed set of named flags.
///
/// Domestic flags gate the core's negotiation and trade actions.
/// Import/export flags are carried for cross-border listings but are not
/// consulted by the domestic trade flows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingCapabilities {
    /// May post requirements and buy domestically.
    pub domestic_buy: bool,
    /// May post availabilities and sell domestically.
    pub domestic_sell: bool,
    /// May import from abroad.
    pub import_allowed: bool,
    /// May export abroad.
    pub export_allowed: bool,
}

impl TradingCapabilities {
    /// Capabilities for a fully enabled domestic trader.
    pub fn domestic() -> Self {
        Self {
            domestic_buy: true,
            domestic_sell: true,
            import_allowed: false,
            export_allowed: false,
        }
    }

    /// Whether the record permits acting in `direction` domestically.
    pub fn allows(&self, direction: TradeDirection) -> bool {
        match direction {
            TradeDirection::Buy => self.domestic_buy,
            TradeDirection::Sell => self.domestic_sell,
        }
    }
}

/// Outcome of a capability check: an allow/deny verdict with the reason
/// for a denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDecision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Why not, when denied.
    pub reason: Option<String>,
}

impl CapabilityDecision {
    /// An allowing decision.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// A denying decision with its reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Black-box predicate service over partner capabilities.
///
/// Callers propagate a denial as `Authorization`; the service itself
/// only reports the decision.
#[async_trait]
pub trait CapabilityService: Send + Sync {
    /// Check whether `partner` may act in `direction`.
    async fn check(
        &self,
        partner: &PartnerId,
        direction: TradeDirection,
    ) -> Result<CapabilityDecision, MandiError>;
}

/// In-memory capability service backed by registered records.
///
/// Partners without a record are denied: capability is granted by
/// onboarding, never assumed.
#[derive(Default)]
pub struct StaticCapabilityService {
    records: RwLock<HashMap<PartnerId, TradingCapabilities>>,
}

impl StaticCapabilityService {
    /// Empty service; every check is denied until partners register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a partner's capability record.
    pub fn register(&self, partner: PartnerId, capabilities: TradingCapabilities) {
        self.records.write().insert(partner, capabilities);
    }
}

#[async_trait]
impl CapabilityService for StaticCapabilityService {
    async fn check(
        &self,
        partner: &PartnerId,
        direction: TradeDirection,
    ) -> Result<CapabilityDecision, MandiError> {
        let records = self.records.read();
        let decision = match records.get(partner) {
            Some(caps) if caps.allows(direction) => CapabilityDecision::allow(),
            Some(_) => CapabilityDecision::deny(format!(
                "partner {partner} lacks the {direction} capability"
            )),
            None => CapabilityDecision::deny(format!("partner {partner} has no capability record")),
        };
        Ok(decision)
    }
}

impl std::fmt::Debug for StaticCapabilityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCapabilityService")
            .field("partners", &self.records.read().len())
            .finish()
    }
}
