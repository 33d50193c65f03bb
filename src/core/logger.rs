//! Logger facade
//!
//! [`Logger`] is the only type application code needs: it filters by level,
//! builds a redacted [`LogRecord`](super::log_record::LogRecord) on the
//! calling thread and hands it to the [`Dispatcher`] without waiting for any
//! sink.

use super::{
    config::{DispatcherConfig, LoggerConfig, SinkClients},
    dispatcher::Dispatcher,
    error::{LoggerError, Result},
    log_context::LogMetadata,
    log_level::LogLevel,
    log_record::{Message, SourceLocation},
    metrics::{DispatchReport, SinkStats},
    overflow_policy::{OutcomeCallback, OverflowCallback, OverflowPolicy},
    record_builder::RecordBuilder,
    redactor::{RedactionConfig, Redactor},
    request::RequestSummary,
    sink::Sink,
};
use crate::sinks::{CloudAggregatorSink, ConsoleSink, DocumentStoreSink, FileSink};
use parking_lot::RwLock;
use std::time::Duration;

/// Structured, redacting, non-blocking logger
///
/// Construct one at startup (with [`Logger::builder`] or
/// [`Logger::from_config`]) and share it through an `Arc`. Dropping the last
/// reference drains the sink queues for up to the configured shutdown
/// timeout ([`DEFAULT_SHUTDOWN_TIMEOUT`](crate::DEFAULT_SHUTDOWN_TIMEOUT) by default);
/// call [`Logger::shutdown`] for an explicit timeout and a delivery report.
///
/// # Example
///
/// ```
/// use masked_logger::prelude::*;
/// use std::time::Duration;
///
/// let capture = MemorySink::new("capture");
/// let records = capture.handle();
///
/// let mut logger = Logger::builder()
///     .min_level(LogLevel::Debug)
///     .sink(capture)
///     .build()
///     .unwrap();
///
/// logger.info(r#"{"password": "SuperSecret123"}"#);
/// logger.shutdown(Duration::from_secs(1));
///
/// assert!(!records.records()[0].message().contains("SuperSecret123"));
/// ```
pub struct Logger {
    min_level: RwLock<LogLevel>,
    builder: RecordBuilder,
    dispatcher: Dispatcher,
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build a logger from resolved configuration
    ///
    /// Fails if the configuration is invalid or an enabled remote sink has no
    /// client in `clients`.
    pub fn from_config(config: LoggerConfig, mut clients: SinkClients) -> Result<Self> {
        config.validate()?;

        let mut builder = Logger::builder()
            .min_level(config.min_level)
            .redaction(config.redaction)
            .dispatcher_config(config.dispatcher);

        let sinks = config.sinks;

        if let Some(console) = &sinks.console {
            builder = builder.sink(ConsoleSink::from_config(console));
        }

        if let Some(file) = &sinks.file {
            builder = builder.sink(FileSink::from_config(file)?);
        }

        if let Some(aggregator) = &sinks.aggregator {
            let client = clients.aggregator.take().ok_or_else(|| {
                LoggerError::config(
                    "aggregator sink",
                    "enabled but no log stream client was supplied",
                )
            })?;
            builder = builder.sink(CloudAggregatorSink::from_config(aggregator, client));
        }

        if let Some(store) = &sinks.document_store {
            let client = clients.document_store.take().ok_or_else(|| {
                LoggerError::config(
                    "document store sink",
                    "enabled but no document store client was supplied",
                )
            })?;
            builder = builder.sink(DocumentStoreSink::from_config(store, client));
        }

        builder.build()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    pub fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= *self.min_level.read()
    }

    pub fn redactor(&self) -> &Redactor {
        self.builder.redactor()
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<Message>) {
        self.log_with_metadata(level, message, LogMetadata::new());
    }

    #[track_caller]
    pub fn log_with_metadata(
        &self,
        level: LogLevel,
        message: impl Into<Message>,
        metadata: LogMetadata,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let location = SourceLocation::from_caller(std::panic::Location::caller());
        self.emit(level, &message.into(), metadata, location);
    }

    /// Log with an explicit source location
    ///
    /// Used by the logging macros, which know the module path and function.
    pub fn log_at(
        &self,
        level: LogLevel,
        message: impl Into<Message>,
        metadata: LogMetadata,
        location: SourceLocation,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        self.emit(level, &message.into(), metadata, location);
    }

    fn emit(&self, level: LogLevel, message: &Message, metadata: LogMetadata, location: SourceLocation) {
        let record = self.builder.build(level, message, metadata, location);
        self.dispatcher.dispatch(record);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<Message>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<Message>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl Into<Message>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<Message>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl Into<Message>) {
        self.log(LogLevel::Critical, message);
    }

    #[track_caller]
    pub fn debug_with_metadata(&self, message: impl Into<Message>, metadata: LogMetadata) {
        self.log_with_metadata(LogLevel::Debug, message, metadata);
    }

    #[track_caller]
    pub fn info_with_metadata(&self, message: impl Into<Message>, metadata: LogMetadata) {
        self.log_with_metadata(LogLevel::Info, message, metadata);
    }

    #[track_caller]
    pub fn warning_with_metadata(&self, message: impl Into<Message>, metadata: LogMetadata) {
        self.log_with_metadata(LogLevel::Warning, message, metadata);
    }

    #[track_caller]
    pub fn error_with_metadata(&self, message: impl Into<Message>, metadata: LogMetadata) {
        self.log_with_metadata(LogLevel::Error, message, metadata);
    }

    #[track_caller]
    pub fn critical_with_metadata(&self, message: impl Into<Message>, metadata: LogMetadata) {
        self.log_with_metadata(LogLevel::Critical, message, metadata);
    }

    /// Log an error together with its source chain at `ERROR` level
    ///
    /// The chain is appended to the message as `message: err: cause: ...`.
    #[track_caller]
    pub fn exception(&self, message: &str, err: &(dyn std::error::Error + 'static)) {
        let mut text = format!("{}: {}", message, err);
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.log(LogLevel::Error, text);
    }

    /// Log a finished request at `INFO` level
    #[track_caller]
    pub fn request(&self, summary: &RequestSummary) {
        if !self.is_enabled(LogLevel::Info) {
            return;
        }
        let (message, metadata) = summary.clone().into_parts();
        let location = SourceLocation::from_caller(std::panic::Location::caller());
        self.emit(LogLevel::Info, &message, metadata, location);
    }

    /// Per-sink delivery counters
    pub fn metrics(&self) -> Vec<SinkStats> {
        self.dispatcher.metrics()
    }

    /// Total records dropped across all sinks
    pub fn dropped_count(&self) -> u64 {
        self.metrics().iter().map(|s| s.dropped).sum()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.dispatcher.sink_names()
    }

    /// Stop accepting records and drain the sink queues
    ///
    /// Waits at most `timeout`; records still queued after that are counted
    /// as dropped in the returned report. Records logged afterwards are
    /// counted as rejected. When the logger is dropped without calling this,
    /// the builder's `shutdown_timeout` is used.
    ///
    /// # Example
    ///
    /// ```
    /// use masked_logger::prelude::*;
    /// use std::time::Duration;
    ///
    /// let mut logger = Logger::builder().sink(MemorySink::new("m")).build().unwrap();
    /// logger.info("Important message");
    ///
    /// let report = logger.shutdown(Duration::from_secs(10));
    /// if !report.completed {
    ///     eprintln!("Warning: logger shutdown timed out");
    /// }
    /// ```
    pub fn shutdown(&mut self, timeout: Duration) -> DispatchReport {
        self.dispatcher.shutdown(timeout)
    }
}

/// Builder for [`Logger`]
///
/// # Example
/// ```
/// use masked_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .min_level(LogLevel::Debug)
///     .sink(ConsoleSink::new())
///     .queue_capacity(1000)
///     .overflow_policy(OverflowPolicy::AlertAndDrop)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} logs dropped", count);
///     }))
///     .build()
///     .unwrap();
/// ```
pub struct LoggerBuilder {
    min_level: LogLevel,
    redaction: RedactionConfig,
    sinks: Vec<Box<dyn Sink>>,
    dispatcher: DispatcherConfig,
    on_overflow: Option<OverflowCallback>,
    on_outcome: Option<OutcomeCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Info,
            redaction: RedactionConfig::default(),
            sinks: Vec::new(),
            dispatcher: DispatcherConfig::default(),
            on_overflow: None,
            on_outcome: None,
        }
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Set the sensitive field names and mask token
    #[must_use = "builder methods return a new value"]
    pub fn redaction(mut self, config: RedactionConfig) -> Self {
        self.redaction = config;
        self
    }

    /// Add a sink
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Add an already boxed sink
    #[must_use = "builder methods return a new value"]
    pub fn boxed_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Bounded queue size per sink
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.dispatcher.queue_capacity = capacity;
        self
    }

    /// Set the overflow policy for full sink queues
    ///
    /// Default is `AlertAndDrop`.
    ///
    /// # Example
    ///
    /// ```
    /// use masked_logger::prelude::*;
    /// use std::time::Duration;
    ///
    /// let logger = Logger::builder()
    ///     .sink(MemorySink::new("m"))
    ///     .queue_capacity(100)
    ///     .overflow_policy(OverflowPolicy::BlockWithTimeout(Duration::from_millis(50)))
    ///     .build()
    ///     .unwrap();
    /// ```
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.dispatcher.overflow_policy = policy;
        self
    }

    /// Drain timeout used when the logger is dropped
    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.dispatcher.shutdown_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher = config;
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The parameter is the total count of records dropped by the sink whose
    /// queue overflowed.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Set a callback invoked with every sink outcome
    #[must_use = "builder methods return a new value"]
    pub fn on_outcome(mut self, callback: OutcomeCallback) -> Self {
        self.on_outcome = Some(callback);
        self
    }

    /// Build the Logger
    ///
    /// Fails on invalid redaction or dispatcher settings, or when no sink
    /// was added.
    pub fn build(self) -> Result<Logger> {
        let redactor = Redactor::new(self.redaction)?;
        let dispatcher = Dispatcher::with_callbacks(
            self.sinks,
            self.dispatcher,
            self.on_overflow,
            self.on_outcome,
        )?;

        Ok(Logger {
            min_level: RwLock::new(self.min_level),
            builder: RecordBuilder::new(redactor),
            dispatcher,
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
