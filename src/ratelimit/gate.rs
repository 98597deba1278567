//! Admission gate: one allow/deny decision per request.

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::ledger::{MemoryLedger, QuotaLedger};
use super::policy::QuotaPolicy;
use super::scope::Scope;
use super::verdict::{DenyReason, Verdict};
use super::window::{now_millis, Window};
use crate::error::{QuotaError, StorageError};

/// Enforces a per-client and a global fixed-window quota.
///
/// The ledger sits behind one async mutex, which is the only serialization
/// point for counter state. A whole decision (peeks, increments, sweep) runs
/// while holding it, so two racing callers can never both observe room
/// under a limit and both be counted past it. Callers only wait to acquire
/// the lock; nothing inside it awaits.
pub struct AdmissionGate<L: QuotaLedger = MemoryLedger> {
    /// Counter storage
    ledger: Mutex<L>,
    /// Policy used by [`AdmissionControl::admit`](super::AdmissionControl::admit)
    policy: RwLock<QuotaPolicy>,
}

impl AdmissionGate<MemoryLedger> {
    /// Create a gate backed by an in-process ledger.
    pub fn in_memory(policy: QuotaPolicy) -> Self {
        Self::new(MemoryLedger::new(), policy)
    }
}

impl<L: QuotaLedger> AdmissionGate<L> {
    /// Create a gate over the given ledger.
    pub fn new(ledger: L, policy: QuotaPolicy) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            policy: RwLock::new(policy),
        }
    }

    /// Replace the default policy. In-flight checks keep the policy they
    /// started with.
    pub fn set_policy(&self, policy: QuotaPolicy) {
        *self.policy.write() = policy;
    }

    /// Get the current default policy.
    pub fn policy(&self) -> QuotaPolicy {
        *self.policy.read()
    }

    /// Check a request from `client_id` against `policy` using the wall clock.
    pub async fn check_now(&self, client_id: &str, policy: &QuotaPolicy) -> Verdict {
        self.check(client_id, policy, now_millis()).await
    }

    /// Decide whether a request from `client_id` at `now_ms` may proceed.
    ///
    /// The per-client quota is checked first and short-circuits before the
    /// global counter is read. A denied request increments nothing. Storage
    /// faults never surface: the request is allowed with `fail_open` set.
    pub async fn check(&self, client_id: &str, policy: &QuotaPolicy, now_ms: u64) -> Verdict {
        let client = Scope::client(client_id);
        let client_window = Window::resolve(now_ms, policy.client_window_ms());
        let global_window = Window::resolve(now_ms, policy.global_window_ms());

        trace!(
            scope = %client,
            now_ms,
            client_window = client_window.id,
            global_window = global_window.id,
            "Checking admission"
        );

        let mut ledger = self.ledger.lock().await;

        let verdict = match decide(&mut *ledger, &client, policy, client_window, global_window) {
            Ok(verdict) => verdict,
            Err(e) => {
                let error = QuotaError::StorageUnavailable(e);
                warn!(
                    scope = %client,
                    error = %error,
                    "Quota ledger failed, admitting request without counting it"
                );
                Verdict::Allowed {
                    client_count: 0,
                    client_limit: policy.client_limit(),
                    global_count: 0,
                    global_limit: policy.global_limit(),
                    reset_time: client_window.end,
                    fail_open: true,
                }
            }
        };

        let client_threshold = client_window.sweep_threshold(policy.client_window_ms());
        match sweep_family(ledger.sweep_clients(client_threshold)) {
            Ok(0) => {}
            Ok(removed) => debug!(older_than = client_threshold, removed, "Expired client windows removed"),
            Err(e) => warn!(scope = %client, older_than = client_threshold, error = %e, "Sweep failed"),
        }

        let global_threshold = global_window.sweep_threshold(policy.global_window_ms());
        match sweep_family(ledger.sweep(&Scope::Global, global_threshold)) {
            Ok(0) => {}
            Ok(removed) => debug!(older_than = global_threshold, removed, "Expired global windows removed"),
            Err(e) => warn!(scope = %Scope::Global, older_than = global_threshold, error = %e, "Sweep failed"),
        }

        verdict
    }

    /// Window ids currently stored for `scope`.
    pub async fn window_ids(&self, scope: &Scope) -> Vec<u64> {
        self.ledger.lock().await.window_ids(scope)
    }

    /// Get the number of stored counter entries.
    pub async fn entry_count(&self) -> usize {
        self.ledger.lock().await.entry_count()
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing.
    pub async fn clear(&self) {
        self.ledger.lock().await.clear();
    }
}

fn decide<L: QuotaLedger + ?Sized>(
    ledger: &mut L,
    client: &Scope,
    policy: &QuotaPolicy,
    client_window: Window,
    global_window: Window,
) -> Result<Verdict, StorageError> {
    let client_count = ledger.peek(client, client_window.id)?;
    if client_count >= policy.client_limit() {
        debug!(
            scope = %client,
            window_id = client_window.id,
            count = client_count,
            limit = policy.client_limit(),
            "Per-client quota exhausted"
        );
        return Ok(Verdict::Denied {
            reason: DenyReason::PerClient,
            count: client_count,
            limit: policy.client_limit(),
            reset_time: client_window.end,
        });
    }

    let global_count = ledger.peek(&Scope::Global, global_window.id)?;
    if global_count >= policy.global_limit() {
        debug!(
            scope = %client,
            window_id = global_window.id,
            count = global_count,
            limit = policy.global_limit(),
            "Global quota exhausted"
        );
        return Ok(Verdict::Denied {
            reason: DenyReason::Global,
            count: global_count,
            limit: policy.global_limit(),
            reset_time: global_window.end,
        });
    }

    let client_count = ledger.increment(client, client_window.id)?;
    let global_count = ledger.increment(&Scope::Global, global_window.id)?;

    Ok(Verdict::Allowed {
        client_count,
        client_limit: policy.client_limit(),
        global_count,
        global_limit: policy.global_limit(),
        reset_time: client_window.end,
        fail_open: false,
    })
}

fn sweep_family(result: Result<usize, StorageError>) -> Result<usize, QuotaError> {
    result.map_err(|e| QuotaError::Sweep(e.to_string()))
}
