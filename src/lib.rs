//! # Masked Logger
//!
//! Structured JSON logging with sensitive-field masking, request correlation
//! ids and non-blocking fan-out to multiple sinks.
//!
//! ## Features
//!
//! - **Redaction**: `password`/`email` values and bare email addresses are
//!   masked before a record leaves the calling thread
//! - **Correlation**: every record carries a correlation id, taken from the
//!   call, the ambient [`CorrelationContext`], or freshly generated
//! - **Multiple Sinks**: console, JSON-lines file, cloud log aggregator and
//!   document store, each with its own bounded queue and worker thread
//! - **Failure Isolation**: a failing or panicking sink never affects the
//!   application or the other sinks
//!
//! ## Example
//!
//! ```
//! use masked_logger::prelude::*;
//! use std::time::Duration;
//!
//! let mut logger = Logger::builder()
//!     .sink(MemorySink::new("memory"))
//!     .build()
//!     .unwrap();
//!
//! let _guard = CorrelationContext::adopt_inbound(Some("req-1"));
//! logger.info_with_metadata(
//!     "user signed in with password=hunter2",
//!     LogMetadata::new().user_id("42"),
//! );
//!
//! let report = logger.shutdown(Duration::from_secs(5));
//! assert_eq!(report.total_delivered(), 1);
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        CorrelationContext, CorrelationGuard, DispatchReport, FieldValue, LogContext, LogLevel,
        LogMetadata, LogRecord, Logger, LoggerBuilder, LoggerConfig, LoggerError, Message,
        OutcomeCallback, OverflowCallback, OverflowPolicy, RedactionConfig, RequestSummary,
        Result, Sink, SinkClients, SinkOutcome, SinkStats, TimestampFormat,
        DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{
        CloudAggregatorSink, ConsoleSink, DocumentStoreSink, FileSink, MemorySink,
    };
}

pub use core::{
    AggregatorConfig, ConsoleConfig, ConsoleFormat, CorrelationContext, CorrelationGuard,
    DispatchReport, Dispatcher, DispatcherConfig, DocumentStoreConfig, FieldValue, FileConfig,
    LogContext, LogLevel, LogMetadata, LogRecord, Logger, LoggerBuilder, LoggerConfig,
    LoggerError, Message, OutcomeCallback, OverflowCallback, OverflowPolicy, RecordBuilder,
    RedactionConfig, Redactor, RequestSummary, Result, Sink, SinkClients, SinkConfig,
    SinkMetrics, SinkOutcome, SinkStats, SourceLocation, TimestampFormat, ANONYMOUS_USER,
    CORRELATION_HEADER, DEFAULT_MASK, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
    NOT_AVAILABLE,
};
pub use sinks::{
    AggregatorTarget, ArchiveStats, ArchiveUploader, CloudAggregatorSink, ConsoleSink,
    DocumentStore, DocumentStoreSink, FileSink, LogArchiver, LogStreamClient, MemoryHandle,
    MemorySink,
};
