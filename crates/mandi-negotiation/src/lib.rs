//! # mandi-negotiation — Offer Exchange for the Mandi Trade Core
//!
//! Everything between "two partners were matched" and "these exact
//! terms were agreed": the [`Negotiation`] aggregate (a validated state
//! machine over alternating buyer/seller offers), its append-only
//! [`NegotiationOffer`] and [`NegotiationMessage`] records, the
//! [`NegotiationStore`] persistence contract with its atomic composite
//! commands, and the [`NegotiationEngine`] that orchestrates them
//! against the match-token manager and the partner services.
//!
//! ## Hard rules the aggregate enforces
//!
//! - Offers alternate sides; the same side never offers twice in a row.
//! - Rounds are a gapless 1-based sequence.
//! - Only the side that did not make the latest offer may accept or
//!   reject it, and only once an offer exists.
//! - The 48-hour window is fixed at initiation; activity never extends
//!   it. Terminal statuses accept no further action.

pub mod engine;
pub mod error;
pub mod message;
pub mod negotiation;
pub mod offer;
pub mod store;

pub use engine::NegotiationEngine;
pub use error::NegotiationError;
pub use message::NegotiationMessage;
pub use negotiation::{
    Actor, Negotiation, NegotiationOutcome, NegotiationStatus, NegotiationTransition,
    StartOptions, NEGOTIATION_VALIDITY_HOURS,
};
pub use offer::{
    AiAssistMetadata, DeliveryTerms, NegotiationOffer, OfferProposal, OfferStatus, OfferTerms,
    PaymentTerms, QualityTerms,
};
pub use store::{FinalDecision, NegotiationStore, PriorOfferDisposition};
