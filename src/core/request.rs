//! Request completion summaries
//!
//! An HTTP layer builds one [`RequestSummary`] per finished request and hands
//! it to [`Logger::request`](super::logger::Logger::request).

use super::correlation::CorrelationContext;
use super::log_context::LogMetadata;
use super::log_record::{Message, ANONYMOUS_USER};
use serde_json::json;
use std::time::{Duration, Instant};

/// One finished request
///
/// # Example
///
/// ```
/// use masked_logger::RequestSummary;
/// use std::time::Duration;
///
/// let summary = RequestSummary::new("GET", "/health", 200, Duration::from_millis(3))
///     .user_id("42");
/// assert_eq!(summary.status_code, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub execution_time: Duration,
    pub user_id: Option<String>,
    pub correlation_id: Option<String>,
}

impl RequestSummary {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        execution_time: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status_code,
            execution_time,
            user_id: None,
            correlation_id: None,
        }
    }

    /// Summary timed from `started` until now
    pub fn since(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        started: Instant,
    ) -> Self {
        Self::new(method, path, status_code, started.elapsed())
    }

    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Correlation id taken from the inbound request, if any
    #[must_use]
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Structured message and metadata for the request record
    ///
    /// The correlation id falls back to the ambient context, then to a fresh
    /// id, so the message body and the record always agree.
    pub(crate) fn into_parts(self) -> (Message, LogMetadata) {
        let correlation_id = self
            .correlation_id
            .filter(|id| !id.trim().is_empty())
            .or_else(CorrelationContext::get)
            .unwrap_or_else(CorrelationContext::generate_id);
        let user_id = self
            .user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        // Seconds, rounded to 0.1 ms
        let seconds = (self.execution_time.as_secs_f64() * 10_000.0).round() / 10_000.0;

        let message = Message::Structured(json!({
            "method": self.method,
            "path": self.path,
            "status_code": self.status_code,
            "execution_time": seconds,
            "user_id": user_id,
            "correlation_id": correlation_id,
        }));

        let metadata = LogMetadata::new()
            .user_id(user_id)
            .correlation_id(correlation_id)
            .execution_time(self.execution_time);

        (message, metadata)
    }
}
