//! Sink trait for log output destinations

use super::{error::Result, log_record::LogRecord};
use std::fmt;

/// A destination for finished log records
///
/// Sinks are only ever driven from a dispatcher worker thread, one worker per
/// sink, so `submit` may block on disk or network I/O without holding up
/// application threads. Errors (and panics) are caught by the worker and
/// turned into a [`SinkOutcome`].
pub trait Sink: Send {
    fn submit(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn submit(&mut self, record: &LogRecord) -> Result<()> {
        (**self).submit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Result of handing one record to one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Delivered,
    Failed { reason: String },
}

impl SinkOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SinkOutcome::Delivered)
    }
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkOutcome::Delivered => write!(f, "delivered"),
            SinkOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}
