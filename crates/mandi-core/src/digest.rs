//! # Content Digest — Document Integrity
//!
//! Defines `ContentDigest` and `DigestAlgorithm` for contract document
//! integrity. The document renderer writes a digest back alongside the
//! document URL after a trade is created; verifiers recompute the digest
//! over the fetched bytes and compare.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MandiError;

/// The hash algorithm used to produce a content digest.
///
/// All stored digests carry an algorithm tag so the rendered form
/// (`sha256:<hex>`) is self-describing and the algorithm can be rotated
/// without a format change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256 — the only algorithm in use.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest with its algorithm tag.
///
/// The 32-byte digest and algorithm tag together form a self-describing
/// integrity identifier, rendered and persisted as `sha256:<64 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a new content digest from raw bytes and algorithm.
    ///
    /// Prefer [`sha256_digest()`] when hashing document bytes.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Parse a digest from its rendered `<algorithm>:<hex>` form.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown algorithm tag, a hex
    /// payload that is not exactly 64 characters, or non-hex characters.
    pub fn parse(s: &str) -> Result<Self, MandiError> {
        let (alg, hex) = s.split_once(':').ok_or_else(|| {
            MandiError::Validation(format!("digest must be <algorithm>:<hex>, got: {s:?}"))
        })?;
        let algorithm = match alg {
            "sha256" => DigestAlgorithm::Sha256,
            other => {
                return Err(MandiError::Validation(format!(
                    "unsupported digest algorithm: {other:?}"
                )))
            }
        };
        if hex.len() != 64 {
            return Err(MandiError::Validation(format!(
                "digest payload must be 64 hex chars, got {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| MandiError::Validation("digest hex is not ASCII".to_string()))?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| {
                MandiError::Validation(format!("invalid hex in digest: {pair:?}"))
            })?;
        }
        Ok(Self { algorithm, bytes })
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 content digest over raw bytes.
///
/// The result carries a `DigestAlgorithm::Sha256` tag.
pub fn sha256_digest(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Compute a SHA-256 hex string over raw bytes.
///
/// Convenience wrapper around [`sha256_digest()`] for contexts that need
/// only the hex form.
pub fn sha256_hex(data: &[u8]) -> String {
    sha256_digest(data).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_digest_deterministic() {
        let d1 = sha256_digest(b"contract body");
        let d2 = sha256_digest(b"contract body");
        assert_eq!(d1, d2);
        assert_eq!(d1.algorithm, DigestAlgorithm::Sha256);
    }

    #[test]
    fn test_sha256_hex_format() {
        let hex = sha256_hex(b"some document");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_digest_display() {
        let digest = sha256_digest(b"x");
        let s = format!("{digest}");
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64); // "sha256:" + 64 hex chars
    }

    #[test]
    fn test_parse_roundtrip() {
        let digest = sha256_digest(b"trade contract TR-2026-00001");
        let parsed = ContentDigest::parse(&digest.to_string()).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert!(ContentDigest::parse("deadbeef").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_algorithm() {
        let hex = "0".repeat(64);
        assert!(ContentDigest::parse(&format!("md5:{hex}")).is_err());
    }

    #[test]
    fn test_parse_rejects_short_payload() {
        assert!(ContentDigest::parse("sha256:abcd").is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let bad = "z".repeat(64);
        assert!(ContentDigest::parse(&format!("sha256:{bad}")).is_err());
    }

    #[test]
    fn test_different_inputs_different_digests() {
        assert_ne!(sha256_digest(b"a"), sha256_digest(b"b"));
    }

    #[test]
    fn test_known_sha256_vector() {
        // SHA256 of the empty input is a published test vector.
        let digest = sha256_digest(b"");
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_known_sha256_abc_vector() {
        let digest = sha256_digest(b"abc");
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
