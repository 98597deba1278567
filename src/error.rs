//! Error types for the Quotagate admission counter.

use thiserror::Error;

/// Main error type for Quotagate operations.
///
/// Only [`QuotaError::Config`] and [`QuotaError::Io`] are ever returned to a
/// caller; storage faults are absorbed by the admission gate.
#[derive(Error, Debug)]
pub enum QuotaError {
    /// A limit or window length is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The ledger's backing store could not be read or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// Expired entries could not be removed
    #[error("Sweep failed: {0}")]
    Sweep(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a [`crate::ratelimit::QuotaLedger`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The store could not be reached at all
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The store was reached but rejected the operation
    #[error("store operation failed: {0}")]
    Operation(String),
}

/// Result type alias for Quotagate operations.
pub type Result<T> = std::result::Result<T, QuotaError>;
