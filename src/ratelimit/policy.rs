//! Validated quota parameters.

use std::num::NonZeroU64;

use serde::Serialize;

use crate::error::{QuotaError, Result};

/// Limits and window lengths for one admission decision.
///
/// A policy can only be built through [`QuotaPolicy::new`], so every limit
/// and window length seen by the gate is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaPolicy {
    client_limit: u64,
    client_window_ms: NonZeroU64,
    global_limit: u64,
    global_window_ms: NonZeroU64,
}

impl QuotaPolicy {
    /// Validate and build a policy.
    pub fn new(
        client_limit: u64,
        client_window_ms: u64,
        global_limit: u64,
        global_window_ms: u64,
    ) -> Result<Self> {
        Ok(Self {
            client_limit: positive_limit("client", client_limit)?,
            client_window_ms: positive_window("client", client_window_ms)?,
            global_limit: positive_limit("global", global_limit)?,
            global_window_ms: positive_window("global", global_window_ms)?,
        })
    }

    pub fn client_limit(&self) -> u64 {
        self.client_limit
    }

    pub fn client_window_ms(&self) -> NonZeroU64 {
        self.client_window_ms
    }

    pub fn global_limit(&self) -> u64 {
        self.global_limit
    }

    pub fn global_window_ms(&self) -> NonZeroU64 {
        self.global_window_ms
    }
}

fn positive_limit(scope: &str, limit: u64) -> Result<u64> {
    if limit == 0 {
        return Err(QuotaError::Config(format!(
            "{} limit must be positive",
            scope
        )));
    }
    Ok(limit)
}

fn positive_window(scope: &str, window_ms: u64) -> Result<NonZeroU64> {
    NonZeroU64::new(window_ms).ok_or_else(|| {
        QuotaError::Config(format!("{} window length must be positive", scope))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_policy() {
        let policy = QuotaPolicy::new(2, 60_000, 3, 120_000).unwrap();
        assert_eq!(policy.client_limit(), 2);
        assert_eq!(policy.client_window_ms().get(), 60_000);
        assert_eq!(policy.global_limit(), 3);
        assert_eq!(policy.global_window_ms().get(), 120_000);
    }

    #[test]
    fn test_zero_values_rejected() {
        for (cl, cw, gl, gw) in [
            (0, 60_000, 3, 60_000),
            (2, 0, 3, 60_000),
            (2, 60_000, 0, 60_000),
            (2, 60_000, 3, 0),
        ] {
            let err = QuotaPolicy::new(cl, cw, gl, gw).unwrap_err();
            assert!(matches!(err, QuotaError::Config(_)), "got {err:?}");
        }
    }

    #[test]
    fn test_error_names_the_scope() {
        let err = QuotaPolicy::new(1, 1, 1, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: global window length must be positive"
        );
    }
}
