//! Quotagate - Admission Control Counter
//!
//! This crate decides, for every inbound request of a request-shaping proxy,
//! whether it may proceed. Two independently scoped quotas are enforced over
//! epoch-aligned fixed windows: one per client and one for the whole service.
//! All counter reads and writes go through a single serialization point so
//! concurrent callers can never overshoot a limit.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use error::{QuotaError, Result, StorageError};
pub use ratelimit::{
    AdmissionControl, AdmissionGate, DenyReason, MemoryLedger, QuotaLedger, QuotaPolicy, Scope,
    Verdict, Window,
};
