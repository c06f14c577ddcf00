//! Instant trade contracts.
//!
//! An accepted negotiation becomes a binding contract in one call:
//! commercial terms are copied and frozen, branch addresses resolve through
//! override / single-eligible / default rules into immutable snapshots, GST
//! is computed from the shipping states, and a yearly-sequenced
//! `TR-YYYY-NNNNN` number is allocated atomically with the insert. From
//! there the contract walks a validated delivery lifecycle
//! (`ACTIVE` through `COMPLETED`, with `DISPUTED` as a recoverable pause)
//! recorded in an append-only transition log.
//!
//! Hard rules the aggregate enforces:
//!
//! * status moves only along the transition table in [`status`]
//! * terminal trades (`COMPLETED`, `CANCELLED`) accept nothing further
//! * a failed transition leaves the trade untouched
//! * address snapshots, once frozen, are never replaced
//! * entering `DELIVERED` stamps the actual delivery date exactly once

pub mod address;
pub mod engine;
pub mod error;
pub mod gst;
pub mod number;
pub mod status;
pub mod store;
pub mod trade;

pub use address::{AddressSnapshot, BranchSelection, SelectionSource};
pub use engine::{BranchOverrides, TradeEngine};
pub use error::TradeError;
pub use gst::{ComponentRate, GstBreakdown, GstConfig, GstType, TaxComponent};
pub use number::TradeNumber;
pub use status::TradeStatus;
pub use store::TradeStore;
pub use trade::{Trade, TradeDraft, TradeTransition};
