//! # Party Sides
//!
//! Every negotiation and trade has exactly two parties: the buyer behind
//! a requirement and the seller behind an availability. `PartySide`
//! identifies which of the two an actor is, after the actor's partner id
//! has been matched against the record's buyer/seller ids.

use serde::{Deserialize, Serialize};

/// Which side of a pairing a partner is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartySide {
    /// The demand side: owns the requirement, receives the goods.
    Buyer,
    /// The supply side: owns the availability, ships the goods.
    Seller,
}

impl PartySide {
    /// Returns the canonical side name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "BUYER",
            Self::Seller => "SELLER",
        }
    }

    /// The other side of the table.
    ///
    /// Offer alternation is expressed as "the next offer must come from
    /// `last_offer_by.opposite()`".
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buyer => Self::Seller,
            Self::Seller => Self::Buyer,
        }
    }
}

impl std::fmt::Display for PartySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        assert_eq!(PartySide::Buyer.opposite(), PartySide::Seller);
        assert_eq!(PartySide::Seller.opposite(), PartySide::Buyer);
        assert_eq!(PartySide::Buyer.opposite().opposite(), PartySide::Buyer);
    }

    #[test]
    fn display_uses_canonical_names() {
        assert_eq!(PartySide::Buyer.to_string(), "BUYER");
        assert_eq!(PartySide::Seller.to_string(), "SELLER");
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&PartySide::Buyer).unwrap();
        assert_eq!(json, "\"BUYER\"");
        let side: PartySide = serde_json::from_str("\"SELLER\"").unwrap();
        assert_eq!(side, PartySide::Seller);
    }
}
