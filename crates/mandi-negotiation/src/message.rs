//! # Negotiation Messages
//!
//! Append-only chat and audit lines attached to a negotiation. Parties
//! write them when starting, offering, accepting, or rejecting; the
//! expiry sweep writes system lines. Messages are never edited or
//! deleted.

use serde::{Deserialize, Serialize};

use mandi_core::{MessageId, NegotiationId, Timestamp};

use crate::negotiation::Actor;

/// One chat or audit line in a negotiation's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationMessage {
    pub id: MessageId,
    pub negotiation_id: NegotiationId,
    pub author: Actor,
    pub body: String,
    pub sent_at: Timestamp,
}

impl NegotiationMessage {
    /// A new message line.
    pub fn new(
        negotiation_id: NegotiationId,
        author: Actor,
        body: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::new(),
            negotiation_id,
            author,
            body: body.into(),
            sent_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_serializes_screaming() {
        let message = NegotiationMessage::new(
            NegotiationId::new(),
            Actor::System,
            "expired without agreement",
            Timestamp::from_epoch_secs(1_760_000_000).unwrap(),
        );
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["author"], "SYSTEM");
        assert_eq!(json["body"], "expired without agreement");
    }
}
