//! Cloud log aggregator sink
//!
//! Forwards the JSON wire form of each record to a named log group and
//! stream through a [`LogStreamClient`]. The client (an HTTP or SDK wrapper)
//! is supplied by the application.

use crate::core::config::AggregatorConfig;
use crate::core::{LogRecord, LoggerError, Result, Sink};
use std::fmt;

/// Log group, stream and region a record is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorTarget {
    pub group: String,
    pub stream: String,
    pub region: String,
}

impl From<&AggregatorConfig> for AggregatorTarget {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            group: config.group.clone(),
            stream: config.stream.clone(),
            region: config.region.clone(),
        }
    }
}

impl fmt::Display for AggregatorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.group, self.stream, self.region)
    }
}

/// Client for a cloud log aggregation service
///
/// Called only from the sink's worker thread, so implementations may block.
pub trait LogStreamClient: Send {
    /// Create the group and stream if they do not exist yet
    ///
    /// Called before the first event is sent, and again after a failure.
    fn ensure_stream(&mut self, _target: &AggregatorTarget) -> Result<()> {
        Ok(())
    }

    /// Send one event; `message` is the record's JSON wire form
    fn put_log_event(
        &mut self,
        target: &AggregatorTarget,
        timestamp_ms: i64,
        message: &str,
    ) -> Result<()>;
}

impl<C: LogStreamClient + ?Sized> LogStreamClient for Box<C> {
    fn ensure_stream(&mut self, target: &AggregatorTarget) -> Result<()> {
        (**self).ensure_stream(target)
    }

    fn put_log_event(
        &mut self,
        target: &AggregatorTarget,
        timestamp_ms: i64,
        message: &str,
    ) -> Result<()> {
        (**self).put_log_event(target, timestamp_ms, message)
    }
}

/// Sink that ships records to a cloud log aggregator
///
/// # Example
///
/// ```
/// use masked_logger::sinks::{AggregatorTarget, CloudAggregatorSink, LogStreamClient};
/// use masked_logger::Result;
///
/// struct StdoutClient;
///
/// impl LogStreamClient for StdoutClient {
///     fn put_log_event(&mut self, target: &AggregatorTarget, _ts: i64, message: &str) -> Result<()> {
///         println!("{} {}", target, message);
///         Ok(())
///     }
/// }
///
/// let target = AggregatorTarget {
///     group: "app".into(),
///     stream: "web".into(),
///     region: "us-east-1".into(),
/// };
/// let sink = CloudAggregatorSink::new(target, StdoutClient);
/// ```
pub struct CloudAggregatorSink {
    target: AggregatorTarget,
    client: Box<dyn LogStreamClient>,
    stream_ready: bool,
}

impl CloudAggregatorSink {
    pub fn new(target: AggregatorTarget, client: impl LogStreamClient + 'static) -> Self {
        Self::with_boxed_client(target, Box::new(client))
    }

    pub fn with_boxed_client(target: AggregatorTarget, client: Box<dyn LogStreamClient>) -> Self {
        Self {
            target,
            client,
            stream_ready: false,
        }
    }

    pub fn from_config(config: &AggregatorConfig, client: Box<dyn LogStreamClient>) -> Self {
        Self::with_boxed_client(AggregatorTarget::from(config), client)
    }

    pub fn target(&self) -> &AggregatorTarget {
        &self.target
    }
}

impl Sink for CloudAggregatorSink {
    fn submit(&mut self, record: &LogRecord) -> Result<()> {
        if !self.stream_ready {
            self.client.ensure_stream(&self.target).map_err(|e| {
                LoggerError::sink("aggregator", format!("{}: {}", self.target, e))
            })?;
            self.stream_ready = true;
        }

        let result = self.client.put_log_event(
            &self.target,
            record.timestamp().timestamp_millis(),
            &record.to_json_string(),
        );

        if let Err(e) = result {
            // Stream may have been deleted; re-check before the next event
            self.stream_ready = false;
            return Err(LoggerError::sink(
                "aggregator",
                format!("{}: {}", self.target, e),
            ));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "aggregator"
    }
}
