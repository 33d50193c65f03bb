//! Assembles redacted log records from raw log calls

use super::correlation::CorrelationContext;
use super::log_context::LogMetadata;
use super::log_level::LogLevel;
use super::log_record::{LogRecord, Message, SourceLocation, ANONYMOUS_USER};
use super::redactor::Redactor;
use chrono::Utc;

/// Builds [`LogRecord`]s
///
/// Every record passes through the redactor and gets a non-empty
/// correlation id, resolved in this order:
/// 1. `metadata.correlation_id`
/// 2. the ambient [`CorrelationContext`]
/// 3. a freshly generated id
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    redactor: Redactor,
}

impl RecordBuilder {
    pub fn new(redactor: Redactor) -> Self {
        Self { redactor }
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Build a record; never fails
    pub fn build(
        &self,
        level: LogLevel,
        message: &Message,
        metadata: LogMetadata,
        location: SourceLocation,
    ) -> LogRecord {
        let LogMetadata {
            user_id,
            correlation_id,
            execution_time,
            message_id,
            mut extra,
        } = metadata;

        let correlation_id = non_blank(correlation_id)
            .or_else(|| non_blank(CorrelationContext::get()))
            .unwrap_or_else(CorrelationContext::generate_id);

        self.redactor.redact_context(&mut extra);

        LogRecord {
            timestamp: Utc::now(),
            level,
            message: self.redactor.redact(message),
            message_id: non_blank(message_id),
            location,
            execution_time,
            user_id: non_blank(user_id).unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            correlation_id,
            extra,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
