//! # Storage backends
//!
//! Two implementations of the persistence contracts defined by the
//! domain crates ([`mandi_match::TokenStore`],
//! [`mandi_negotiation::NegotiationStore`], [`mandi_trade::TradeStore`]
//! and [`mandi_partner::BranchDirectory`]):
//!
//! - [`MemoryStore`]: a single-mutex in-memory store. The default when
//!   no database is configured, and the backend the engine tests run
//!   against.
//! - [`PgStore`]: PostgreSQL via SQLx, with embedded migrations run by
//!   [`init_pool`]. Composite commands use row locks; single-statement
//!   status writes are compare-and-set guarded.
//!
//! Both backends enforce the same store-owned invariants: one
//! negotiation per match token, one trade per negotiation, and gapless
//! per-year trade numbering.

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::{init_pool, PgStore};
