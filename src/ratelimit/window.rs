//! Epoch-aligned fixed window resolution.

use std::num::NonZeroU64;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A resolved fixed window `[start, end)`, in milliseconds since the epoch.
///
/// The window id is the window start, so every caller observing the same
/// instant and window length agrees on the id without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    /// Identifier of the window (equal to `start`)
    pub id: u64,
    /// First millisecond belonging to the window
    pub start: u64,
    /// First millisecond of the following window
    pub end: u64,
}

impl Window {
    /// Resolve the window containing `now_ms` for windows of `length_ms`.
    pub fn resolve(now_ms: u64, length_ms: NonZeroU64) -> Self {
        let length = length_ms.get();
        let start = now_ms - now_ms % length;
        Self {
            id: start,
            start,
            end: start.saturating_add(length),
        }
    }

    /// Entries with a window id below this threshold are expired.
    ///
    /// One full window of grace is kept behind the current one, so the
    /// previous window stays queryable until the next rollover.
    pub fn sweep_threshold(&self, length_ms: NonZeroU64) -> u64 {
        self.id.saturating_sub(length_ms.get())
    }
}

/// Named window lengths accepted in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of this time unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }

    /// Window length in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.duration().as_millis() as u64
    }
}

/// Milliseconds since the Unix epoch according to the system clock.
///
/// A clock set before the epoch reads as zero.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
