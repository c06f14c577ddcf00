//! # Error Taxonomy — Typed Failure Categories
//!
//! One taxonomy enum for the whole trade core. Every rule violation is
//! raised synchronously from the operation that detects it and is never
//! caught or downgraded internally: a failed capability check aborts the
//! action, it does not degrade to a warning.
//!
//! ## Design
//!
//! - Messages name the violated invariant ("cannot accept your own offer",
//!   not "bad request") so client UIs can react specifically.
//! - `code()` returns the stable machine-readable code clients branch on.
//! - Domain sub-errors (negotiation, trade, token) are dedicated enums in
//!   their own crates and convert into this taxonomy via `From`, so `?`
//!   works across crate boundaries.

use thiserror::Error;

/// Top-level error type for the Mandi trade core.
#[derive(Error, Debug)]
pub enum MandiError {
    /// Malformed input: non-positive price or quantity, a branch override
    /// that belongs to the wrong partner, an unparsable identifier.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller is not a party to the record, or lacks the trading
    /// capability the action requires.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind ("match token", "negotiation", "trade", "branch").
        kind: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// A uniqueness or compare-and-set invariant would be violated:
    /// duplicate trade for a negotiation, stale status on a guarded write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain invariant blocks the action: wrong turn to offer,
    /// negotiation not accepted, risk FAIL, missing signature, invalid
    /// status transition.
    #[error("business rule violation: {0}")]
    BusinessRule(String),

    /// Time-based invalidity: token or negotiation past its expiry.
    #[error("expired: {0}")]
    Expired(String),

    /// Storage backend failure. The underlying message is preserved.
    #[error("storage error: {0}")]
    Storage(String),
}

impl MandiError {
    /// Stable machine-readable code for this error's category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Authorization(_) => "AUTHORIZATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::BusinessRule(_) => "BUSINESS_RULE_ERROR",
            Self::Expired(_) => "EXPIRED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Construct a [`MandiError::NotFound`] for a record kind and id.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
