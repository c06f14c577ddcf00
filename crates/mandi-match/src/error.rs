//! # Match Token Errors
//!
//! Structured errors for token issuance and disclosure. These convert
//! into the workspace taxonomy ([`MandiError`]) via `From`, so callers
//! above the domain layer see stable error codes.

use mandi_core::{MandiError, Timestamp};
use thiserror::Error;

/// Errors raised by match token operations.
#[derive(Error, Debug)]
pub enum TokenError {
    /// A token code string does not have the `MATCH-<base32>` shape.
    #[error("invalid token code {code:?}: {reason}")]
    InvalidCode {
        /// The offending input.
        code: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The token's expiry passed before a negotiation was started.
    #[error("match token {code} expired at {expires_at}")]
    Expired {
        /// The expired token's code.
        code: String,
        /// When it expired.
        expires_at: Timestamp,
    },
}

impl From<TokenError> for MandiError {
    fn from(err: TokenError) -> Self {
        match &err {
            TokenError::InvalidCode { .. } => MandiError::Validation(err.to_string()),
            TokenError::Expired { .. } => MandiError::Expired(err.to_string()),
        }
    }
}
