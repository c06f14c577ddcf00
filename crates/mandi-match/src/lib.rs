//! # mandi-match — Anonymous Match Tokens
//!
//! The entry gate of the trade core. A computed match between a buyer's
//! requirement and a seller's availability is anonymized behind a
//! [`MatchToken`]: an opaque `MATCH-<base32>` code with independent
//! per-side disclosure levels that only ever move upward
//! (`MATCHED → NEGOTIATING → TRADE`).
//!
//! - **Token** ([`token`]): the aggregate, its code format, and the
//!   disclosure ladder.
//! - **Store** ([`store`]): the persistence contract; the storage layer's
//!   create-only insert is the authoritative uniqueness guard for codes.
//! - **Manager** ([`manager`]): issuance with bounded collision retry,
//!   identity reveal, and trade marking.

pub mod error;
pub mod manager;
pub mod store;
pub mod token;

// Re-export primary types for ergonomic imports.
pub use error::TokenError;
pub use manager::MatchTokenManager;
pub use store::TokenStore;
pub use token::{
    DisclosureLevel, MatchPairing, MatchToken, TokenCode, TOKEN_VALIDITY_DAYS,
};
