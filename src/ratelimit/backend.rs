//! Admission control trait consumed by the request-handling layer.

use async_trait::async_trait;
use tracing::{info, instrument};

use super::gate::AdmissionGate;
use super::ledger::QuotaLedger;
use super::verdict::Verdict;

/// Trait for admission control implementations.
///
/// The protocol dispatcher holds one of these behind an `Arc` and asks it
/// about every inbound request before forwarding it downstream.
#[async_trait]
pub trait AdmissionControl: Send + Sync {
    /// Decide whether a request from `client_id` observed at `now_ms` may proceed.
    async fn admit(&self, client_id: &str, now_ms: u64) -> Verdict;
}

#[async_trait]
impl<L: QuotaLedger + 'static> AdmissionControl for AdmissionGate<L> {
    #[instrument(skip(self))]
    async fn admit(&self, client_id: &str, now_ms: u64) -> Verdict {
        let policy = self.policy();
        let verdict = self.check(client_id, &policy, now_ms).await;

        if verdict.is_fail_open() {
            info!(client_id, "Admitted in degraded mode");
        }

        verdict
    }
}
