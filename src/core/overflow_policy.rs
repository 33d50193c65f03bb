//! Backpressure policies for per-sink dispatch queues
//!
//! Each sink has a bounded queue. When a log storm fills it, the policy
//! decides what happens to the record that does not fit. None of the
//! policies can block the caller indefinitely.

use super::sink::SinkOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling a full sink queue
///
/// # Example
///
/// ```
/// use masked_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: alert and drop
/// let policy = OverflowPolicy::default();
///
/// // Wait a little for the worker, then drop
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new record, counting it
    DropNewest,

    /// Evict the oldest queued record to make room for the new one
    DropOldest,

    /// Wait up to the given duration for space, then drop
    ///
    /// This is the only policy under which a log call can take noticeable
    /// time. The duration is a single budget for the whole fan-out, so a log
    /// call waits at most this long however many sinks are full.
    BlockWithTimeout(Duration),

    /// Drop the new record and alert via stderr and the overflow callback
    AlertAndDrop,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::AlertAndDrop
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when records are dropped because a sink queue is full.
/// The parameter is the total count of dropped records for that sink so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Callback type for per-sink delivery outcomes
///
/// Invoked on the sink's worker thread with the sink name and the outcome.
pub type OutcomeCallback = Arc<dyn Fn(&str, &SinkOutcome) + Send + Sync>;
