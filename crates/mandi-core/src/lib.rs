//! # mandi-core — Foundational Types for the Mandi Trade Core
//!
//! This crate is the bedrock of the Mandi trade core. It defines the shared
//! type-system primitives that the matching, negotiation, and trade crates
//! build on. Every other crate in the workspace depends on `mandi-core`; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `PartnerId`, `NegotiationId`,
//!    `TradeId`, `BranchId` — all newtypes over UUIDs. No bare strings or raw
//!    UUIDs cross a module boundary.
//!
//! 2. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z suffix
//!    and seconds precision, so expiry comparisons and audit records never
//!    depend on local clocks or sub-second noise.
//!
//! 3. **Exact decimal money.** All prices, quantities, and tax amounts are
//!    `rust_decimal::Decimal`. Binary floats are confined to advisory scores
//!    (match relevance, AI confidence) that never feed arithmetic.
//!
//! 4. **One error taxonomy.** `MandiError` carries a stable machine-readable
//!    code per category so callers can branch on failure class without string
//!    matching.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mandi-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement `Serialize`/`Deserialize`.

pub mod commodity;
pub mod digest;
pub mod error;
pub mod identity;
pub mod money;
pub mod party;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use commodity::CommodityDescriptor;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::MandiError;
pub use identity::{
    AvailabilityId, BranchId, MessageId, NegotiationId, OfferId, PartnerId, RequirementId, TradeId,
};
pub use money::{ensure_non_negative, ensure_positive};
pub use party::PartySide;
pub use temporal::Timestamp;
