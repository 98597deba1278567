//! Admission decisions and their diagnostics.

use std::fmt;

use serde::Serialize;

/// The quota that caused a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    PerClient,
    Global,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::PerClient => f.write_str("per_client"),
            DenyReason::Global => f.write_str("global"),
        }
    }
}

/// Outcome of one admission check.
///
/// `reset_time` is the end of the relevant window in milliseconds since the
/// epoch: the client window for admissions and per-client denials, the
/// global window for global denials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Both quotas had room; counts are post-increment.
    Allowed {
        client_count: u64,
        client_limit: u64,
        global_count: u64,
        global_limit: u64,
        reset_time: u64,
        /// Set when the ledger failed and the request was let through
        /// without being counted.
        fail_open: bool,
    },
    /// One quota was already at or above its limit; nothing was counted.
    Denied {
        reason: DenyReason,
        count: u64,
        limit: u64,
        reset_time: u64,
    },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed { .. })
    }

    /// Whether this admission was granted in degraded mode.
    pub fn is_fail_open(&self) -> bool {
        matches!(self, Verdict::Allowed { fail_open: true, .. })
    }

    /// The scope that denied the request, if any.
    pub fn denied_scope(&self) -> Option<DenyReason> {
        match self {
            Verdict::Denied { reason, .. } => Some(*reason),
            Verdict::Allowed { .. } => None,
        }
    }

    /// Count reported to the caller: the client count for admissions, the
    /// offending scope's count for denials.
    pub fn count(&self) -> u64 {
        match self {
            Verdict::Allowed { client_count, .. } => *client_count,
            Verdict::Denied { count, .. } => *count,
        }
    }

    /// Limit paired with [`Verdict::count`].
    pub fn limit(&self) -> u64 {
        match self {
            Verdict::Allowed { client_limit, .. } => *client_limit,
            Verdict::Denied { limit, .. } => *limit,
        }
    }

    /// Requests left in the reported window.
    pub fn remaining(&self) -> u64 {
        self.limit().saturating_sub(self.count())
    }

    pub fn reset_time(&self) -> u64 {
        match self {
            Verdict::Allowed { reset_time, .. } | Verdict::Denied { reset_time, .. } => *reset_time,
        }
    }

    /// Milliseconds a denied caller should wait before retrying.
    pub fn retry_after_ms(&self, now_ms: u64) -> Option<u64> {
        match self {
            Verdict::Denied { reset_time, .. } => Some(reset_time.saturating_sub(now_ms)),
            Verdict::Allowed { .. } => None,
        }
    }
}
