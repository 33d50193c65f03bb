//! Log record structure and its serialized forms

use super::log_context::LogContext;
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

/// Placeholder used in the wire form for values that were not supplied
pub const NOT_AVAILABLE: &str = "N/A";

/// Default user id for records logged outside an authenticated context
pub const ANONYMOUS_USER: &str = "anonymous";

// Thread-local cache for the thread label to avoid repeated allocations
thread_local! {
    static THREAD_LABEL_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Get the cached thread label (name if set, id otherwise)
pub(crate) fn current_thread_label() -> String {
    THREAD_LABEL_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                let thread = std::thread::current();
                match thread.name() {
                    Some(name) => name.to_string(),
                    None => format!("{:?}", thread.id()),
                }
            })
            .clone()
    })
}

/// Replace line breaks and tabs with escape sequences
///
/// Used by line-oriented renderers so a message cannot forge extra log lines.
pub(crate) fn sanitize_line(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Log message payload as supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Free text
    Text(String),
    /// Structured mapping, serialized after redaction
    Structured(Value),
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<&String> for Message {
    fn from(s: &String) -> Self {
        Message::Text(s.clone())
    }
}

impl From<Value> for Message {
    fn from(v: Value) -> Self {
        Message::Structured(v)
    }
}

impl From<LogContext> for Message {
    fn from(ctx: LogContext) -> Self {
        Message::Structured(ctx.to_json_value())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(s) => write!(f, "{}", s),
            Message::Structured(v) => write!(f, "{}", v),
        }
    }
}

/// Where a log call originated (best effort)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub module: String,
    pub function: String,
    pub file: String,
    pub line: u32,
    pub thread: String,
}

impl SourceLocation {
    /// Location from a caller captured with `#[track_caller]`
    ///
    /// Module and function are unknown without the logging macros; the
    /// file stem stands in for the module.
    pub fn from_caller(caller: &std::panic::Location<'_>) -> Self {
        let file = caller.file().to_string();
        let module = std::path::Path::new(caller.file())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(NOT_AVAILABLE)
            .to_string();
        Self {
            module,
            function: NOT_AVAILABLE.to_string(),
            file,
            line: caller.line(),
            thread: current_thread_label(),
        }
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }
}

/// A finished, redacted log record
///
/// Built only by [`RecordBuilder`](super::record_builder::RecordBuilder);
/// immutable afterwards. The dispatcher shares it with sinks behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) level: LogLevel,
    pub(crate) message: String,
    pub(crate) message_id: Option<String>,
    pub(crate) location: SourceLocation,
    pub(crate) execution_time: Option<Duration>,
    pub(crate) user_id: String,
    pub(crate) correlation_id: String,
    pub(crate) extra: LogContext,
}

impl LogRecord {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Redacted message content
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn execution_time(&self) -> Option<Duration> {
        self.execution_time
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Redacted extra fields
    pub fn extra(&self) -> &LogContext {
        &self.extra
    }

    fn execution_time_value(&self) -> Value {
        self.execution_time
            .and_then(|d| serde_json::Number::from_f64(d.as_secs_f64()))
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(NOT_AVAILABLE.to_string()))
    }

    /// Wire form consumed by downstream log parsers
    ///
    /// ```text
    /// {"timestamp", "type", "msg body": {"id", "content"}, "module",
    ///  "function", "line", "thread", "execution_time", "user_id",
    ///  "correlation_id"}
    /// ```
    pub fn to_json(&self) -> Value {
        json!({
            "timestamp": TimestampFormat::Iso8601Micros.format(&self.timestamp),
            "type": self.level.to_str(),
            "msg body": {
                "id": self.message_id.as_deref().unwrap_or(NOT_AVAILABLE),
                "content": self.message,
            },
            "module": self.location.module,
            "function": self.location.function,
            "line": self.location.line,
            "thread": self.location.thread,
            "execution_time": self.execution_time_value(),
            "user_id": self.user_id,
            "correlation_id": self.correlation_id,
        })
    }

    /// Wire form as a single JSON line
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Flat document for document stores
    pub fn to_document(&self) -> Value {
        let mut doc = json!({
            "timestamp": TimestampFormat::Iso8601Micros.format(&self.timestamp),
            "level": self.level.to_str(),
            "message": self.message,
            "user_id": self.user_id,
            "correlation_id": self.correlation_id,
        });
        if let Value::Object(ref mut map) = doc {
            if let Some(elapsed) = self.execution_time {
                map.insert("execution_time".to_string(), json!(elapsed.as_secs_f64()));
            }
            if !self.extra.is_empty() {
                map.insert("extra".to_string(), self.extra.to_json_value());
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            level: LogLevel::Warning,
            message: "disk almost full".to_string(),
            message_id: None,
            location: SourceLocation {
                module: "storage".to_string(),
                function: "check_quota".to_string(),
                file: "src/storage.rs".to_string(),
                line: 42,
                thread: "main".to_string(),
            },
            execution_time: None,
            user_id: ANONYMOUS_USER.to_string(),
            correlation_id: "c0ffee".to_string(),
            extra: LogContext::new(),
        }
    }

    #[test]
    fn test_wire_shape() {
        let value = sample_record().to_json();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "correlation_id",
                "execution_time",
                "function",
                "line",
                "module",
                "msg body",
                "thread",
                "timestamp",
                "type",
                "user_id",
            ]
        );
        assert_eq!(value["type"], "WARNING");
        assert_eq!(value["msg body"]["id"], NOT_AVAILABLE);
        assert_eq!(value["msg body"]["content"], "disk almost full");
        assert_eq!(value["execution_time"], NOT_AVAILABLE);
        assert_eq!(value["line"], 42);
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_wire_execution_time_in_seconds() {
        let mut record = sample_record();
        record.execution_time = Some(Duration::from_millis(250));
        assert_eq!(record.to_json()["execution_time"], 0.25);
    }

    #[test]
    fn test_document_form() {
        let mut record = sample_record();
        record.extra = LogContext::new().with_field("route", "/health");

        let doc = record.to_document();
        assert_eq!(doc["level"], "WARNING");
        assert_eq!(doc["message"], "disk almost full");
        assert_eq!(doc["extra"]["route"], "/health");
        assert!(doc.get("execution_time").is_none());
    }

    #[test]
    fn test_sanitize_line() {
        assert_eq!(sanitize_line("a\nb\rc\td"), "a\\nb\\rc\\td");
    }

    #[test]
    fn test_location_from_caller() {
        let location = SourceLocation::from_caller(std::panic::Location::caller());
        assert_eq!(location.module, "log_record");
        assert_eq!(location.function, NOT_AVAILABLE);
        assert!(location.line > 0);
        assert!(!location.thread.is_empty());
    }
}
