//! Core logger types and traits

pub mod config;
pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod log_context;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod record_builder;
pub mod redactor;
pub mod request;
pub mod sink;
pub mod timestamp;

pub use config::{
    AggregatorConfig, ConsoleConfig, ConsoleFormat, DispatcherConfig, DocumentStoreConfig,
    FileConfig, LoggerConfig, SinkClients, SinkConfig, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use correlation::{CorrelationContext, CorrelationGuard, CORRELATION_HEADER};
pub use dispatcher::Dispatcher;
pub use error::{LoggerError, Result};
pub use log_context::{FieldValue, LogContext, LogMetadata};
pub use log_level::LogLevel;
pub use log_record::{LogRecord, Message, SourceLocation, ANONYMOUS_USER, NOT_AVAILABLE};
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{DispatchReport, SinkMetrics, SinkStats};
pub use overflow_policy::{OutcomeCallback, OverflowCallback, OverflowPolicy};
pub use record_builder::RecordBuilder;
pub use redactor::{RedactionConfig, Redactor, DEFAULT_MASK};
pub use request::RequestSummary;
pub use sink::{Sink, SinkOutcome};
pub use timestamp::TimestampFormat;
