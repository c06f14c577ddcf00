//! # Match Tokens — Anonymous Pairing Handles
//!
//! A match token binds one requirement to one availability behind an
//! opaque code, so that buyer and seller can evaluate a match without
//! learning who is on the other side. Identity is released stepwise
//! through per-side disclosure levels.
//!
//! ## Disclosure Ladder
//!
//! ```text
//! MATCHED ──reveal()──▶ NEGOTIATING ──mark_traded()──▶ TRADE
//! ```
//!
//! Each side's level moves independently and only ever upward. A token
//! whose expiry passes before any negotiation starts becomes inert; it
//! is never deleted.

use rand::Rng;
use serde::{Deserialize, Serialize};

use mandi_core::{
    AvailabilityId, CommodityDescriptor, PartnerId, PartySide, RequirementId, Timestamp,
};

use crate::error::TokenError;

/// How long an untouched token stays actionable, in days.
pub const TOKEN_VALIDITY_DAYS: i64 = 30;

// ── Token Code ─────────────────────────────────────────────────────────

/// Alphabet for token code payloads: Crockford base32 (no I, L, O, U),
/// chosen so codes survive being read aloud or retyped.
const CODE_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Payload length: 128 random bits at 5 bits per character, rounded up.
const CODE_PAYLOAD_LEN: usize = 26;

/// The externally visible prefix every token code carries.
const CODE_PREFIX: &str = "MATCH-";

// ── Validating Deserialize for TokenCode ──────────────────────────────

impl<'de> Deserialize<'de> for TokenCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// An opaque, collision-resistant token code: `MATCH-` followed by a
/// base32-encoded 128-bit random value.
///
/// The format is compatibility-bearing: existing records and UIs carry
/// these codes, so the `MATCH-` prefix is stable. Everything after the
/// prefix is opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TokenCode(String);

impl TokenCode {
    /// Generate a fresh code from 128 bits of randomness.
    ///
    /// Uniqueness is probabilistic here; the authoritative guard is the
    /// store's create-only insert, which the manager retries on collision.
    pub fn generate() -> Self {
        let value: u128 = rand::thread_rng().gen();
        Self(format!("{CODE_PREFIX}{}", encode_base32(value)))
    }

    /// Validate and wrap an existing code string.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidCode`] if the prefix, payload length,
    /// or payload alphabet is wrong.
    pub fn new(value: impl Into<String>) -> Result<Self, TokenError> {
        let value = value.into();
        let Some(payload) = value.strip_prefix(CODE_PREFIX) else {
            return Err(TokenError::InvalidCode {
                code: value,
                reason: format!("must start with {CODE_PREFIX:?}"),
            });
        };
        if payload.len() != CODE_PAYLOAD_LEN {
            return Err(TokenError::InvalidCode {
                reason: format!(
                    "payload must be {CODE_PAYLOAD_LEN} characters, got {}",
                    payload.len()
                ),
                code: value,
            });
        }
        if let Some(bad) = payload.bytes().find(|b| !CODE_ALPHABET.contains(b)) {
            return Err(TokenError::InvalidCode {
                reason: format!("invalid payload character {:?}", bad as char),
                code: value,
            });
        }
        Ok(Self(value))
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a 128-bit value as 26 base32 characters, most significant first.
fn encode_base32(value: u128) -> String {
    (0..CODE_PAYLOAD_LEN)
        .rev()
        .map(|i| CODE_ALPHABET[((value >> (i * 5)) & 0x1f) as usize] as char)
        .collect()
}

// ── Disclosure Level ───────────────────────────────────────────────────

/// How much identity information the token currently reveals to one side.
///
/// The derived ordering *is* the disclosure ladder: levels only ever
/// increase, enforced by the token's mutators taking the maximum of the
/// current and requested level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisclosureLevel {
    /// Matched anonymously; no identities visible.
    Matched,
    /// Negotiation started; identities revealed.
    Negotiating,
    /// Trade concluded.
    Trade,
}

impl DisclosureLevel {
    /// The canonical string name of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "MATCHED",
            Self::Negotiating => "NEGOTIATING",
            Self::Trade => "TRADE",
        }
    }
}

impl std::fmt::Display for DisclosureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Pairing ────────────────────────────────────────────────────────────

/// The requirement/availability pairing a token anonymizes.
///
/// Produced by the matching service (an external collaborator) and handed
/// to [`MatchTokenManager::issue`](crate::manager::MatchTokenManager::issue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPairing {
    /// The buyer's posted requirement.
    pub requirement_id: RequirementId,
    /// The seller's posted availability.
    pub availability_id: AvailabilityId,
    /// Partner behind the requirement.
    pub buyer_partner_id: PartnerId,
    /// Partner behind the availability.
    pub seller_partner_id: PartnerId,
    /// What the pairing trades.
    pub commodity: CommodityDescriptor,
    /// Match relevance score in `0..=1`. Advisory only; no invariant
    /// reads it.
    pub match_score: f64,
}

// ── The Match Token ────────────────────────────────────────────────────

/// An anonymous, expiring handle on a requirement/availability pairing.
///
/// Created via [`MatchToken::issue`]. Mutated only by negotiation start
/// (disclosure to `NEGOTIATING`) and trade creation (disclosure to
/// `TRADE`); never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchToken {
    /// The token's code, also its identity.
    pub code: TokenCode,
    /// The buyer's posted requirement.
    pub requirement_id: RequirementId,
    /// The seller's posted availability.
    pub availability_id: AvailabilityId,
    /// Partner behind the requirement.
    pub buyer_partner_id: PartnerId,
    /// Partner behind the availability.
    pub seller_partner_id: PartnerId,
    /// What the pairing trades.
    pub commodity: CommodityDescriptor,
    /// Match relevance score in `0..=1`, advisory only.
    pub match_score: f64,
    /// What the token currently reveals to the buyer.
    pub buyer_disclosure: DisclosureLevel,
    /// What the token currently reveals to the seller.
    pub seller_disclosure: DisclosureLevel,
    /// When the token was issued (UTC).
    pub created_at: Timestamp,
    /// When the token stops being actionable if no negotiation starts.
    pub expires_at: Timestamp,
    /// Set once, when the first negotiation is started from this token.
    pub negotiation_started_at: Option<Timestamp>,
}

impl MatchToken {
    /// Issue a new token for a pairing, with a freshly generated code.
    ///
    /// Both disclosure levels start at `MATCHED` and the expiry is
    /// [`TOKEN_VALIDITY_DAYS`] from `now`.
    pub fn issue(pairing: MatchPairing, now: Timestamp) -> Self {
        Self {
            code: TokenCode::generate(),
            requirement_id: pairing.requirement_id,
            availability_id: pairing.availability_id,
            buyer_partner_id: pairing.buyer_partner_id,
            seller_partner_id: pairing.seller_partner_id,
            commodity: pairing.commodity,
            match_score: pairing.match_score,
            buyer_disclosure: DisclosureLevel::Matched,
            seller_disclosure: DisclosureLevel::Matched,
            created_at: now,
            expires_at: now.plus_days(TOKEN_VALIDITY_DAYS),
            negotiation_started_at: None,
        }
    }

    /// Which side of the pairing `partner` is on, if any.
    pub fn side_of(&self, partner: &PartnerId) -> Option<PartySide> {
        if *partner == self.buyer_partner_id {
            Some(PartySide::Buyer)
        } else if *partner == self.seller_partner_id {
            Some(PartySide::Seller)
        } else {
            None
        }
    }

    /// The current disclosure level for one side.
    pub fn disclosure_for(&self, side: PartySide) -> DisclosureLevel {
        match side {
            PartySide::Buyer => self.buyer_disclosure,
            PartySide::Seller => self.seller_disclosure,
        }
    }

    /// Whether the token's expiry instant has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Raise one side's disclosure to `NEGOTIATING` and stamp
    /// `negotiation_started_at` if unset.
    ///
    /// A side already at `NEGOTIATING` or `TRADE` is left unchanged, so
    /// the level never regresses.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] if the expiry has passed and no
    /// negotiation was ever started. A token with a live negotiation
    /// stays revealable past its expiry.
    pub fn reveal(&mut self, side: PartySide, now: Timestamp) -> Result<(), TokenError> {
        if self.is_expired(now) && self.negotiation_started_at.is_none() {
            return Err(TokenError::Expired {
                code: self.code.to_string(),
                expires_at: self.expires_at,
            });
        }
        match side {
            PartySide::Buyer => {
                self.buyer_disclosure = self.buyer_disclosure.max(DisclosureLevel::Negotiating);
            }
            PartySide::Seller => {
                self.seller_disclosure = self.seller_disclosure.max(DisclosureLevel::Negotiating);
            }
        }
        if self.negotiation_started_at.is_none() {
            self.negotiation_started_at = Some(now);
        }
        Ok(())
    }

    /// Raise both sides' disclosure to `TRADE`. Idempotent.
    pub fn mark_traded(&mut self) {
        self.buyer_disclosure = self.buyer_disclosure.max(DisclosureLevel::Trade);
        self.seller_disclosure = self.seller_disclosure.max(DisclosureLevel::Trade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairing() -> MatchPairing {
        MatchPairing {
            requirement_id: RequirementId::new(),
            availability_id: AvailabilityId::new(),
            buyer_partner_id: PartnerId::new(),
            seller_partner_id: PartnerId::new(),
            commodity: CommodityDescriptor::new("COTTON", "MT"),
            match_score: 0.91,
        }
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    // ── TokenCode tests ────────────────────────────────────────────

    #[test]
    fn generated_code_has_expected_shape() {
        let code = TokenCode::generate();
        assert!(code.as_str().starts_with("MATCH-"));
        assert_eq!(code.as_str().len(), "MATCH-".len() + 26);
    }

    #[test]
    fn generated_codes_are_distinct() {
        let a = TokenCode::generate();
        let b = TokenCode::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_code_revalidates() {
        let code = TokenCode::generate();
        let reparsed = TokenCode::new(code.as_str()).unwrap();
        assert_eq!(code, reparsed);
    }

    #[test]
    fn code_rejects_missing_prefix() {
        assert!(TokenCode::new("TOKEN-00000000000000000000000000").is_err());
    }

    #[test]
    fn code_rejects_wrong_payload_length() {
        assert!(TokenCode::new("MATCH-SHORT").is_err());
    }

    #[test]
    fn code_rejects_excluded_characters() {
        // 'U' is not in the Crockford alphabet.
        assert!(TokenCode::new("MATCH-UUUUUUUUUUUUUUUUUUUUUUUUUU").is_err());
    }

    #[test]
    fn code_serde_roundtrip() {
        let code = TokenCode::generate();
        let json = serde_json::to_string(&code).unwrap();
        let back: TokenCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }

    #[test]
    fn code_deserialize_rejects_garbage() {
        assert!(serde_json::from_str::<TokenCode>("\"not-a-code\"").is_err());
    }

    // ── Issue / disclosure tests ───────────────────────────────────

    #[test]
    fn issue_starts_matched_with_30_day_expiry() {
        let token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        assert_eq!(token.buyer_disclosure, DisclosureLevel::Matched);
        assert_eq!(token.seller_disclosure, DisclosureLevel::Matched);
        assert_eq!(token.expires_at, ts("2026-02-14T12:00:00Z"));
        assert!(token.negotiation_started_at.is_none());
    }

    #[test]
    fn side_of_resolves_both_parties() {
        let token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        let buyer = token.buyer_partner_id.clone();
        let seller = token.seller_partner_id.clone();
        assert_eq!(token.side_of(&buyer), Some(PartySide::Buyer));
        assert_eq!(token.side_of(&seller), Some(PartySide::Seller));
        assert_eq!(token.side_of(&PartnerId::new()), None);
    }

    #[test]
    fn reveal_raises_one_side_and_stamps_start() {
        let issued = ts("2026-01-15T12:00:00Z");
        let mut token = MatchToken::issue(pairing(), issued);
        token.reveal(PartySide::Buyer, ts("2026-01-16T09:00:00Z")).unwrap();
        assert_eq!(token.buyer_disclosure, DisclosureLevel::Negotiating);
        assert_eq!(token.seller_disclosure, DisclosureLevel::Matched);
        assert_eq!(token.negotiation_started_at, Some(ts("2026-01-16T09:00:00Z")));
    }

    #[test]
    fn reveal_keeps_existing_start_stamp() {
        let mut token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        token.reveal(PartySide::Buyer, ts("2026-01-16T09:00:00Z")).unwrap();
        token.reveal(PartySide::Seller, ts("2026-01-16T10:00:00Z")).unwrap();
        assert_eq!(token.negotiation_started_at, Some(ts("2026-01-16T09:00:00Z")));
    }

    #[test]
    fn reveal_after_expiry_without_negotiation_fails() {
        let mut token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        let err = token
            .reveal(PartySide::Buyer, ts("2026-02-14T12:00:01Z"))
            .unwrap_err();
        assert!(matches!(err, TokenError::Expired { .. }));
        assert_eq!(token.buyer_disclosure, DisclosureLevel::Matched);
    }

    #[test]
    fn reveal_at_exact_expiry_instant_succeeds() {
        let mut token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        assert!(token.reveal(PartySide::Buyer, ts("2026-02-14T12:00:00Z")).is_ok());
    }

    #[test]
    fn reveal_past_expiry_with_live_negotiation_succeeds() {
        let mut token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        token.reveal(PartySide::Buyer, ts("2026-01-16T09:00:00Z")).unwrap();
        // Seller side catches up after the token's expiry has passed.
        assert!(token.reveal(PartySide::Seller, ts("2026-02-20T00:00:00Z")).is_ok());
    }

    #[test]
    fn mark_traded_raises_both_sides_and_is_idempotent() {
        let mut token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        token.mark_traded();
        let snapshot = token.clone();
        token.mark_traded();
        assert_eq!(token, snapshot);
        assert_eq!(token.buyer_disclosure, DisclosureLevel::Trade);
        assert_eq!(token.seller_disclosure, DisclosureLevel::Trade);
    }

    #[test]
    fn reveal_never_regresses_trade_disclosure() {
        let mut token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
        token.reveal(PartySide::Buyer, ts("2026-01-16T09:00:00Z")).unwrap();
        token.mark_traded();
        token.reveal(PartySide::Buyer, ts("2026-01-17T09:00:00Z")).unwrap();
        assert_eq!(token.buyer_disclosure, DisclosureLevel::Trade);
    }

    #[test]
    fn disclosure_level_ordering_matches_ladder() {
        assert!(DisclosureLevel::Matched < DisclosureLevel::Negotiating);
        assert!(DisclosureLevel::Negotiating < DisclosureLevel::Trade);
    }

    #[test]
    fn disclosure_serde_uses_screaming_names() {
        let json = serde_json::to_string(&DisclosureLevel::Negotiating).unwrap();
        assert_eq!(json, "\"NEGOTIATING\"");
    }

    // ── Monotonicity property ──────────────────────────────────────

    /// One mutation step against a token, for the property below.
    #[derive(Debug, Clone)]
    enum TokenOp {
        RevealBuyer,
        RevealSeller,
        MarkTraded,
    }

    fn token_op() -> impl Strategy<Value = TokenOp> {
        prop_oneof![
            Just(TokenOp::RevealBuyer),
            Just(TokenOp::RevealSeller),
            Just(TokenOp::MarkTraded),
        ]
    }

    proptest! {
        #[test]
        fn disclosure_is_monotonic_under_any_op_sequence(ops in prop::collection::vec(token_op(), 0..24)) {
            let mut token = MatchToken::issue(pairing(), ts("2026-01-15T12:00:00Z"));
            let mut now = ts("2026-01-15T12:00:00Z");
            for op in ops {
                now = now.plus_hours(1);
                let before = (token.buyer_disclosure, token.seller_disclosure);
                match op {
                    TokenOp::RevealBuyer => {
                        let _ = token.reveal(PartySide::Buyer, now);
                    }
                    TokenOp::RevealSeller => {
                        let _ = token.reveal(PartySide::Seller, now);
                    }
                    TokenOp::MarkTraded => token.mark_traded(),
                }
                prop_assert!(token.buyer_disclosure >= before.0);
                prop_assert!(token.seller_disclosure >= before.1);
            }
        }
    }
}
