//! Per-sink delivery counters
//!
//! Each sink worker owns one [`SinkMetrics`]; the dispatcher hands out
//! plain-value [`SinkStats`] snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one sink
///
/// # Example
///
/// ```
/// use masked_logger::SinkMetrics;
///
/// let metrics = SinkMetrics::new();
/// metrics.record_delivered();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.delivered(), 1);
/// assert_eq!(metrics.dropped(), 1);
/// ```
#[derive(Debug)]
pub struct SinkMetrics {
    /// Records the sink accepted
    delivered: AtomicU64,

    /// Records the sink returned an error (or panicked) on
    failed: AtomicU64,

    /// Records never handed to the sink (overflow, shutdown timeout)
    dropped: AtomicU64,

    /// Number of times the queue was found full
    queue_full_events: AtomicU64,

    /// Number of times a producer waited for queue space
    block_events: AtomicU64,
}

impl SinkMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Record a delivered record, returning the previous count
    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a failed submission, returning the previous count
    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped record, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    /// Record several dropped records at once
    #[inline]
    pub fn record_dropped_many(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped() as f64;
        let total = (self.delivered() + self.failed()) as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Plain-value snapshot
    pub fn snapshot(&self, sink: &str) -> SinkStats {
        SinkStats {
            sink: sink.to_string(),
            delivered: self.delivered(),
            failed: self.failed(),
            dropped: self.dropped(),
            queue_full_events: self.queue_full_events(),
            block_events: self.block_events(),
        }
    }
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of one sink's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub sink: String,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
    pub queue_full_events: u64,
    pub block_events: u64,
}

/// Summary returned by a drain/shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// All workers finished within the timeout
    pub completed: bool,
    /// Records offered after shutdown began
    pub rejected: u64,
    pub sinks: Vec<SinkStats>,
}

impl DispatchReport {
    pub fn total_delivered(&self) -> u64 {
        self.sinks.iter().map(|s| s.delivered).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.sinks.iter().map(|s| s.failed).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.sinks.iter().map(|s| s.dropped).sum()
    }
}
