//! # Token Store Contract
//!
//! Persistence boundary for match tokens. Implementations live in
//! `mandi-store` (in-memory and Postgres); the manager only sees this
//! trait.

use async_trait::async_trait;

use mandi_core::MandiError;

use crate::token::{MatchToken, TokenCode};

/// Persistence contract for match tokens.
///
/// The token code is the primary key. `insert` is create-only: the
/// storage layer's uniqueness guard, not an application pre-check, is
/// what makes token codes collision-safe.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a freshly issued token.
    ///
    /// # Errors
    ///
    /// `Conflict` if a token with the same code already exists;
    /// `Storage` on backend failure.
    async fn insert(&self, token: &MatchToken) -> Result<(), MandiError>;

    /// Fetch a token by code.
    ///
    /// # Errors
    ///
    /// `NotFound` if no token has this code.
    async fn fetch(&self, code: &TokenCode) -> Result<MatchToken, MandiError>;

    /// Persist an updated token (disclosure levels, negotiation stamp).
    ///
    /// # Errors
    ///
    /// `NotFound` if the token was never inserted.
    async fn update(&self, token: &MatchToken) -> Result<(), MandiError>;
}
