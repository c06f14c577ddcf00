//! # mandi-partner — Partner Services for the Mandi Trade Core
//!
//! Collaborator boundaries the negotiation and trade engines consult
//! about the partners themselves: what a partner may do
//! ([`CapabilityService`]), whether a counterparty is safe to deal with
//! ([`RiskService`]), whether a signature is on file
//! ([`SignatureRegistry`]), which branches can fill a trade's shipping
//! and billing slots ([`BranchDirectory`]), and who to tell when a
//! contract is wanted ([`ContractNotifier`]).
//!
//! Each boundary is an `async_trait` object so the engines stay
//! storage- and transport-agnostic. The in-memory implementations here
//! back the tests and the demo wiring; production swaps them for
//! database- or service-backed ones without touching the engines.

pub mod branch;
pub mod capability;
pub mod notifier;
pub mod risk;
pub mod signature;

pub use branch::{
    Branch, BranchDirectory, BranchFilter, BranchSlot, InMemoryBranchDirectory, PostalAddress,
};
pub use capability::{
    CapabilityDecision, CapabilityService, StaticCapabilityService, TradeDirection,
    TradingCapabilities,
};
pub use notifier::{render_stub, ContractNotifier, RecordingNotifier, RenderedContract};
pub use risk::{RiskAssessment, RiskService, RiskVerdict, StaticRiskService};
pub use signature::{InMemorySignatureRegistry, SignatureRegistry};
