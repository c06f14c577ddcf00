//! # Signature Registry
//!
//! Tracks which partners have a digital signature on file. Trade
//! creation requires both parties to be registered here before a
//! contract can be issued against them.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;

use mandi_core::{MandiError, PartnerId};

/// Lookup boundary for signature enrolment.
#[async_trait]
pub trait SignatureRegistry: Send + Sync {
    /// Whether `partner` has a registered digital signature.
    async fn has_signature(&self, partner: &PartnerId) -> Result<bool, MandiError>;
}

/// In-memory registry of enrolled partners.
#[derive(Default)]
pub struct InMemorySignatureRegistry {
    enrolled: RwLock<HashSet<PartnerId>>,
}

impl InMemorySignatureRegistry {
    /// Empty registry; no partner is enrolled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrol a partner's signature.
    pub fn register(&self, partner: PartnerId) {
        self.enrolled.write().insert(partner);
    }
}

#[async_trait]
impl SignatureRegistry for InMemorySignatureRegistry {
    async fn has_signature(&self, partner: &PartnerId) -> Result<bool, MandiError> {
        Ok(self.enrolled.read().contains(partner))
    }
}

impl std::fmt::Debug for InMemorySignatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySignatureRegistry")
            .field("enrolled", &self.enrolled.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unenrolled_partner_has_no_signature() {
        let registry = InMemorySignatureRegistry::new();
        assert!(!registry.has_signature(&PartnerId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn enrolment_is_visible() {
        let registry = InMemorySignatureRegistry::new();
        let partner = PartnerId::new();
        registry.register(partner.clone());
        assert!(registry.has_signature(&partner).await.unwrap());
    }
}
