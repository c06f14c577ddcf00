//! # Contract Notifications
//!
//! When a trade is created, contract generation happens out-of-band:
//! the engine fires a notification and continues, and the rendered
//! document is attached to the trade later. This module holds the
//! notification boundary plus the deterministic stub renderer used by
//! the in-process wiring.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use mandi_core::{sha256_digest, ContentDigest, MandiError, Timestamp, TradeId};

/// A generated contract document ready to attach to a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContract {
    /// Where the document lives.
    pub url: String,
    /// Digest of the document bytes.
    pub digest: ContentDigest,
    pub generated_at: Timestamp,
}

/// Render the plain-text contract stub for a trade.
///
/// The byte layout is fixed so the digest is reproducible from the
/// trade number and body alone.
pub fn render_stub(trade_number: &str, body: &str, now: Timestamp) -> RenderedContract {
    let text = format!("CONTRACT {trade_number}\n\n{body}\n");
    RenderedContract {
        url: format!("file:///contracts/{trade_number}.txt"),
        digest: sha256_digest(text.as_bytes()),
        generated_at: now,
    }
}

/// Receives "contract wanted" events after trade creation. Failures are
/// logged by the caller and never roll the trade back.
#[async_trait]
pub trait ContractNotifier: Send + Sync {
    /// A trade was created and wants its contract generated.
    async fn contract_requested(
        &self,
        trade: &TradeId,
        trade_number: &str,
    ) -> Result<(), MandiError>;
}

/// Notifier that records every request, for tests and the demo wiring.
#[derive(Default)]
pub struct RecordingNotifier {
    requests: RwLock<Vec<(TradeId, String)>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<(TradeId, String)> {
        self.requests.read().clone()
    }
}

#[async_trait]
impl ContractNotifier for RecordingNotifier {
    async fn contract_requested(
        &self,
        trade: &TradeId,
        trade_number: &str,
    ) -> Result<(), MandiError> {
        self.requests
            .write()
            .push((trade.clone(), trade_number.to_string()));
        Ok(())
    }
}

impl std::fmt::Debug for RecordingNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingNotifier")
            .field("requests", &self.requests.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandi_core::sha256_hex;

    #[test]
    fn stub_digest_is_reproducible() {
        let now = Timestamp::from_epoch_secs(1_760_000_000).unwrap();
        let first = render_stub("TR-2026-00042", "500 quintal COTTON @ 5425", now);
        let second = render_stub("TR-2026-00042", "500 quintal COTTON @ 5425", now);
        assert_eq!(first, second);
        assert_eq!(first.url, "file:///contracts/TR-2026-00042.txt");
        assert_eq!(
            first.digest.to_hex(),
            sha256_hex(b"CONTRACT TR-2026-00042\n\n500 quintal COTTON @ 5425\n"),
        );
    }

    #[tokio::test]
    async fn recorder_keeps_arrival_order() {
        let notifier = RecordingNotifier::new();
        let first = TradeId::new();
        let second = TradeId::new();
        notifier.contract_requested(&first, "TR-2026-00001").await.unwrap();
        notifier.contract_requested(&second, "TR-2026-00002").await.unwrap();

        let seen = notifier.requests();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, first);
        assert_eq!(seen[1].1, "TR-2026-00002");
    }
}
