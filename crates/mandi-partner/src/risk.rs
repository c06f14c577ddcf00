//! # Risk Screening
//!
//! Advisory screening of a partner against a commodity and direction
//! before an offer is made or a trade is created. The verdict ladder is
//! PASS, WARN, FAIL: PASS and WARN let the action proceed (WARN is
//! surfaced to operators through logs), FAIL blocks it.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use mandi_core::{CommodityDescriptor, MandiError, PartnerId};

use crate::capability::TradeDirection;

/// Screening verdict for one partner/commodity/direction triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskVerdict {
    /// Nothing flagged.
    Pass,
    /// Flagged but not blocking; operators see it in logs.
    Warn,
    /// Blocking; the action must be refused.
    Fail,
}

impl RiskVerdict {
    /// The canonical string name of this verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict together with what triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// The screening outcome.
    pub verdict: RiskVerdict,
    /// Human-readable trigger, present for WARN and FAIL.
    pub detail: Option<String>,
}

impl RiskAssessment {
    /// A clean PASS.
    pub fn pass() -> Self {
        Self {
            verdict: RiskVerdict::Pass,
            detail: None,
        }
    }

    /// A WARN with its trigger.
    pub fn warn(detail: impl Into<String>) -> Self {
        Self {
            verdict: RiskVerdict::Warn,
            detail: Some(detail.into()),
        }
    }

    /// A FAIL with its trigger.
    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            verdict: RiskVerdict::Fail,
            detail: Some(detail.into()),
        }
    }

    /// Whether the assessed action may proceed.
    pub fn is_blocking(&self) -> bool {
        self.verdict == RiskVerdict::Fail
    }
}

/// Screening boundary consulted before offers and trade creation.
#[async_trait]
pub trait RiskService: Send + Sync {
    /// Screen `partner` trading `commodity` in `direction`.
    async fn assess(
        &self,
        partner: &PartnerId,
        commodity: &CommodityDescriptor,
        direction: TradeDirection,
    ) -> Result<RiskAssessment, MandiError>;
}

/// In-memory risk service: PASS for everyone unless a per-partner
/// override is installed.
#[derive(Default)]
pub struct StaticRiskService {
    overrides: RwLock<HashMap<PartnerId, RiskAssessment>>,
}

impl StaticRiskService {
    /// A service with no overrides; every assessment passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the assessment returned for one partner.
    pub fn set_override(&self, partner: PartnerId, assessment: RiskAssessment) {
        self.overrides.write().insert(partner, assessment);
    }
}

#[async_trait]
impl RiskService for StaticRiskService {
    async fn assess(
        &self,
        partner: &PartnerId,
        _commodity: &CommodityDescriptor,
        _direction: TradeDirection,
    ) -> Result<RiskAssessment, MandiError> {
        let overrides = self.overrides.read();
        Ok(overrides
            .get(partner)
            .cloned()
            .unwrap_or_else(RiskAssessment::pass))
    }
}

impl std::fmt::Debug for StaticRiskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticRiskService")
            .field("overrides", &self.overrides.read().len())
            .finish()
    }
}
