//! # Match Token Manager
//!
//! Issues anonymous tokens for requirement/availability pairings and
//! gates identity disclosure. The manager stays thin: disclosure rules
//! live on [`MatchToken`], uniqueness lives in the store's create-only
//! insert, and the manager wires the two together.

use std::sync::Arc;

use mandi_core::{MandiError, PartySide, Timestamp};

use crate::store::TokenStore;
use crate::token::{MatchPairing, MatchToken, TokenCode};

/// How many code regenerations `issue` attempts before giving up.
///
/// With 128-bit random codes a collision is effectively a storage-layer
/// anomaly; the bound exists so a misbehaving backend cannot trap the
/// caller in a retry loop.
const MAX_ISSUE_ATTEMPTS: u32 = 4;

/// Issues tokens and drives their disclosure lifecycle.
pub struct MatchTokenManager {
    store: Arc<dyn TokenStore>,
}

impl MatchTokenManager {
    /// Create a manager over a token store.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Issue a token for a pairing, regenerating the code on collision.
    ///
    /// Both disclosure levels start at `MATCHED`; expiry is 30 days from
    /// `now`. The store's primary-key guard is the authoritative
    /// uniqueness check.
    ///
    /// # Errors
    ///
    /// `Conflict` if a unique code could not be allocated within the
    /// attempt bound; store errors pass through.
    pub async fn issue(
        &self,
        pairing: MatchPairing,
        now: Timestamp,
    ) -> Result<MatchToken, MandiError> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let token = MatchToken::issue(pairing.clone(), now);
            match self.store.insert(&token).await {
                Ok(()) => {
                    tracing::debug!(code = %token.code, attempt, "issued match token");
                    return Ok(token);
                }
                Err(MandiError::Conflict(reason)) => {
                    tracing::warn!(attempt, reason = %reason, "token code collision, regenerating");
                }
                Err(other) => return Err(other),
            }
        }
        Err(MandiError::Conflict(format!(
            "could not allocate a unique token code in {MAX_ISSUE_ATTEMPTS} attempts"
        )))
    }

    /// Fetch a token for inspection (pairing, disclosure, expiry).
    ///
    /// # Errors
    ///
    /// `NotFound` if the code is unknown.
    pub async fn lookup(&self, code: &TokenCode) -> Result<MatchToken, MandiError> {
        self.store.fetch(code).await
    }

    /// Reveal one side's identity: raise that side's disclosure to
    /// `NEGOTIATING` and stamp `negotiation_started_at` if unset.
    ///
    /// `now` is supplied by the caller so that a flow touching the token
    /// several times (the negotiation engine reveals both sides) applies
    /// one consistent instant.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown code; `Expired` if the token lapsed
    /// before any negotiation started.
    pub async fn reveal(
        &self,
        code: &TokenCode,
        side: PartySide,
        now: Timestamp,
    ) -> Result<MatchToken, MandiError> {
        let mut token = self.store.fetch(code).await?;
        token.reveal(side, now)?;
        self.store.update(&token).await?;
        Ok(token)
    }

    /// Raise both sides' disclosure to `TRADE`. Idempotent.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown code.
    pub async fn mark_traded(&self, code: &TokenCode) -> Result<MatchToken, MandiError> {
        let mut token = self.store.fetch(code).await?;
        token.mark_traded();
        self.store.update(&token).await?;
        Ok(token)
    }
}

impl std::fmt::Debug for MatchTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchTokenManager").finish_non_exhaustive()
    }
}
