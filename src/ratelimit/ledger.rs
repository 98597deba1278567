//! Counter storage for `scope x window -> count`.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::trace;

use super::scope::Scope;
use crate::error::StorageError;

/// Storage for quota counters.
///
/// Implementations are not required to be internally synchronized: the
/// [`AdmissionGate`](super::AdmissionGate) owns its ledger behind a single
/// lock and calls these methods one at a time.
pub trait QuotaLedger: Send {
    /// Current count for `(scope, window_id)`, or 0 when absent.
    fn peek(&self, scope: &Scope, window_id: u64) -> Result<u64, StorageError>;

    /// Add one to `(scope, window_id)`, creating it at 1 when absent.
    ///
    /// Returns the post-increment count.
    fn increment(&mut self, scope: &Scope, window_id: u64) -> Result<u64, StorageError>;

    /// Delete every entry of `scope` whose window id is below `older_than`.
    ///
    /// Returns the number of entries removed.
    fn sweep(&mut self, scope: &Scope, older_than: u64) -> Result<usize, StorageError>;

    /// Delete every client entry, of any client, whose window id is below
    /// `older_than`.
    ///
    /// Clients that stop calling are reclaimed here.
    fn sweep_clients(&mut self, older_than: u64) -> Result<usize, StorageError>;

    /// Window ids currently stored for `scope`, ascending.
    fn window_ids(&self, scope: &Scope) -> Vec<u64>;

    /// Total number of stored entries across all scopes.
    fn entry_count(&self) -> usize;

    /// Drop all entries.
    fn clear(&mut self);
}

/// In-process ledger indexed by scope and by client window.
///
/// Each scope owns an ordered map of window ids, and client entries are also
/// indexed by window id. A sweep only visits stale entries, never the whole
/// store.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    scopes: HashMap<Scope, BTreeMap<u64, u64>>,
    /// Client scopes holding an entry for each window id
    client_windows: BTreeMap<u64, HashSet<Scope>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes with at least one stored entry.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    fn remove_entry(&mut self, scope: &Scope, window_id: u64) {
        if let Some(windows) = self.scopes.get_mut(scope) {
            windows.remove(&window_id);
            if windows.is_empty() {
                self.scopes.remove(scope);
            }
        }
    }
}

impl QuotaLedger for MemoryLedger {
    fn peek(&self, scope: &Scope, window_id: u64) -> Result<u64, StorageError> {
        Ok(self
            .scopes
            .get(scope)
            .and_then(|windows| windows.get(&window_id))
            .copied()
            .unwrap_or(0))
    }

    fn increment(&mut self, scope: &Scope, window_id: u64) -> Result<u64, StorageError> {
        let count = self
            .scopes
            .entry(scope.clone())
            .or_default()
            .entry(window_id)
            .or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;

        if count == 1 && !scope.is_global() {
            self.client_windows
                .entry(window_id)
                .or_default()
                .insert(scope.clone());
        }
        Ok(count)
    }

    fn sweep(&mut self, scope: &Scope, older_than: u64) -> Result<usize, StorageError> {
        let Some(windows) = self.scopes.get_mut(scope) else {
            return Ok(0);
        };

        let retained = windows.split_off(&older_than);
        let expired = std::mem::replace(windows, retained);
        if windows.is_empty() {
            self.scopes.remove(scope);
        }

        if !scope.is_global() {
            for window_id in expired.keys() {
                if let Some(clients) = self.client_windows.get_mut(window_id) {
                    clients.remove(scope);
                    if clients.is_empty() {
                        self.client_windows.remove(window_id);
                    }
                }
            }
        }

        if !expired.is_empty() {
            trace!(scope = %scope, older_than, removed = expired.len(), "Swept expired windows");
        }
        Ok(expired.len())
    }

    fn sweep_clients(&mut self, older_than: u64) -> Result<usize, StorageError> {
        let retained = self.client_windows.split_off(&older_than);
        let expired = std::mem::replace(&mut self.client_windows, retained);

        let mut removed = 0;
        for (window_id, clients) in expired {
            for client in &clients {
                self.remove_entry(client, window_id);
                removed += 1;
            }
        }

        if removed > 0 {
            trace!(
                older_than,
                removed,
                scopes = self.scope_count(),
                "Swept expired client windows"
            );
        }
        Ok(removed)
    }

    fn window_ids(&self, scope: &Scope) -> Vec<u64> {
        self.scopes
            .get(scope)
            .map(|windows| windows.keys().copied().collect())
            .unwrap_or_default()
    }

    fn entry_count(&self) -> usize {
        self.scopes.values().map(BTreeMap::len).sum()
    }

    fn clear(&mut self) {
        self.scopes.clear();
        self.client_windows.clear();
    }
}
