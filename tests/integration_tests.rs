//! Integration tests for the logging pipeline
//!
//! These tests verify:
//! - Sensitive data never reaches a sink
//! - A failing or panicking sink does not affect the others
//! - Logging never waits for a slow sink
//! - Shutdown delivers every accepted record exactly once
//! - Correlation ids do not leak between concurrent units of work
//! - Configuration-driven construction

use masked_logger::prelude::*;
use masked_logger::sinks::{AggregatorTarget, DocumentStore, LogStreamClient, MemoryHandle};
use masked_logger::{LoggerError, RecordBuilder, SourceLocation};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct FailingSink;

impl Sink for FailingSink {
    fn submit(&mut self, _record: &LogRecord) -> Result<()> {
        Err(LoggerError::sink("failing", "connection refused"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct PanickingSink;

impl Sink for PanickingSink {
    fn submit(&mut self, _record: &LogRecord) -> Result<()> {
        panic!("sink exploded");
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Blocks every submit until the test releases it
struct GatedSink {
    gate: crossbeam_channel::Receiver<()>,
    submitted: Arc<AtomicUsize>,
}

impl Sink for GatedSink {
    fn submit(&mut self, _record: &LogRecord) -> Result<()> {
        let _ = self.gate.recv();
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

fn memory_sink(name: &str) -> (MemorySink, MemoryHandle) {
    let sink = MemorySink::new(name);
    let handle = sink.handle();
    (sink, handle)
}

#[test]
fn test_structured_secrets_are_masked_in_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("secrets.log");

    let mut logger = Logger::builder()
        .sink(FileSink::new(&log_file).expect("Failed to create sink"))
        .build()
        .expect("Failed to build logger");

    logger.info(json!({"password": "SuperSecret123", "email": "a@b.com"}));
    logger.info(r#"{"password": "SuperSecret123", "email": "a@b.com"}"#);
    let report = logger.shutdown(Duration::from_secs(5));
    assert!(report.completed);

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert!(!content.contains("SuperSecret123"));
    assert!(!content.contains("a@b.com"));

    for line in content.lines() {
        let value: Value = serde_json::from_str(line).expect("Each line is JSON");
        let body = value["msg body"]["content"].as_str().unwrap();
        assert!(body.contains(r#""password": "*****""#), "content was {}", body);
        assert!(body.contains(r#""email": "*****""#), "content was {}", body);
    }
}

#[test]
fn test_file_sink_writes_wire_form() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("logs").join("app.log");

    let mut logger = Logger::builder()
        .sink(FileSink::new(&log_file).expect("Failed to create sink"))
        .build()
        .unwrap();

    logger.info_with_metadata(
        "Application started",
        LogMetadata::new()
            .user_id("123")
            .correlation_id("abc123")
            .message_id("boot-1")
            .execution_time(Duration::from_millis(1500)),
    );
    logger.warning("User login\nERROR fake entry");
    logger.shutdown(Duration::from_secs(5));

    let content = fs::read_to_string(&log_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "Each record is a single line");

    let first: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["type"], "INFO");
    assert_eq!(first["msg body"]["id"], "boot-1");
    assert_eq!(first["msg body"]["content"], "Application started");
    assert_eq!(first["user_id"], "123");
    assert_eq!(first["correlation_id"], "abc123");
    assert_eq!(first["execution_time"], 1.5);
    assert_eq!(first["module"], "integration_tests");

    let second: Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["type"], "WARNING");
    assert_eq!(second["user_id"], "anonymous");
    assert_eq!(second["execution_time"], "N/A");
    assert_eq!(second["msg body"]["content"], "User login\nERROR fake entry");
}

#[test]
fn test_failing_sinks_do_not_affect_others() {
    let (first, first_records) = memory_sink("first");
    let (second, second_records) = memory_sink("second");

    let mut logger = Logger::builder()
        .sink(FailingSink)
        .sink(first)
        .sink(PanickingSink)
        .sink(second)
        .build()
        .unwrap();

    for i in 0..50 {
        logger.error(format!("event {}", i));
    }
    let report = logger.shutdown(Duration::from_secs(10));

    assert!(report.completed);
    assert_eq!(first_records.len(), 50);
    assert_eq!(second_records.len(), 50);

    let by_name = |name: &str| report.sinks.iter().find(|s| s.sink == name).unwrap().clone();
    assert_eq!(by_name("failing").failed, 50);
    assert_eq!(by_name("panicking").failed, 50);
    assert_eq!(by_name("first").delivered, 50);
    assert_eq!(by_name("second").delivered, 50);
}

#[test]
fn test_logging_does_not_wait_for_slow_sink() {
    let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
    let submitted = Arc::new(AtomicUsize::new(0));
    let (fast, fast_records) = memory_sink("fast");

    let mut logger = Logger::builder()
        .sink(GatedSink {
            gate: gate_rx,
            submitted: Arc::clone(&submitted),
        })
        .sink(fast)
        .queue_capacity(100)
        .build()
        .unwrap();

    let start = Instant::now();
    for i in 0..20 {
        logger.info(format!("request {}", i));
    }
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "logging blocked on a stalled sink"
    );
    assert_eq!(submitted.load(Ordering::SeqCst), 0);

    // The fast sink is not held up by its stalled sibling
    let deadline = Instant::now() + Duration::from_secs(5);
    while fast_records.len() < 20 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(fast_records.len(), 20);

    for _ in 0..20 {
        gate_tx.send(()).unwrap();
    }
    let report = logger.shutdown(Duration::from_secs(5));
    assert!(report.completed);
    assert_eq!(submitted.load(Ordering::SeqCst), 20);
}

#[test]
fn test_shutdown_delivers_each_record_exactly_once() {
    let handles: Vec<(MemorySink, MemoryHandle)> =
        (0..3).map(|i| memory_sink(&format!("sink-{}", i))).collect();

    let mut builder = Logger::builder().queue_capacity(10_000);
    let mut record_handles = Vec::new();
    for (sink, handle) in handles {
        builder = builder.sink(sink);
        record_handles.push(handle);
    }
    let mut logger = builder.build().unwrap();

    std::thread::scope(|scope| {
        for t in 0..4 {
            let logger = &logger;
            scope.spawn(move || {
                for i in 0..250 {
                    logger.info(format!("thread {} message {}", t, i));
                }
            });
        }
    });

    let report = logger.shutdown(Duration::from_secs(10));
    assert!(report.completed);
    assert_eq!(report.total_dropped(), 0);

    for handle in &record_handles {
        let records = handle.records();
        assert_eq!(records.len(), 1000);
        let unique: HashSet<&str> = records.iter().map(|r| r.message()).collect();
        assert_eq!(unique.len(), 1000);

        // Per-producer order is preserved
        for t in 0..4 {
            let prefix = format!("thread {} ", t);
            let ours: Vec<&str> = records
                .iter()
                .map(|r| r.message())
                .filter(|m| m.starts_with(&prefix))
                .collect();
            let expected: Vec<String> = (0..250).map(|i| format!("thread {} message {}", t, i)).collect();
            assert_eq!(ours, expected);
        }
    }
}

#[test]
fn test_concurrent_correlation_isolation() {
    let (sink, handle) = memory_sink("memory");
    let mut logger = Logger::builder().sink(sink).build().unwrap();

    std::thread::scope(|scope| {
        for unit in ["req-A", "req-B"] {
            let logger = &logger;
            scope.spawn(move || {
                let _guard = CorrelationContext::enter(unit);
                for i in 0..200 {
                    logger.info(format!("{} step {}", unit, i));
                }
            });
        }
    });
    logger.shutdown(Duration::from_secs(10));

    let records = handle.records();
    assert_eq!(records.len(), 400);
    for record in &records {
        let unit = record.message().split(' ').next().unwrap();
        assert_eq!(record.correlation_id(), unit);
    }
}

#[test]
fn test_inbound_correlation_header() {
    let (sink, handle) = memory_sink("memory");
    let mut logger = Logger::builder().sink(sink).build().unwrap();

    {
        let _guard = CorrelationContext::adopt_inbound(Some("upstream-9"));
        logger.request(
            &RequestSummary::new("GET", "/orders", 200, Duration::from_millis(8)).user_id("5"),
        );
    }
    {
        let _guard = CorrelationContext::adopt_inbound(None);
        logger.info("no header");
    }
    logger.shutdown(Duration::from_secs(5));

    let records = handle.records();
    assert_eq!(records[0].correlation_id(), "upstream-9");
    assert_eq!(records[0].user_id(), "5");
    assert!(records[0].message().contains(r#""correlation_id": "upstream-9""#));
    assert_eq!(records[1].correlation_id().len(), 32);
    assert_eq!(CorrelationContext::get(), None);
}

#[test]
fn test_generated_ids_are_unique() {
    let builder = RecordBuilder::default();
    let mut seen = HashSet::new();

    for _ in 0..10_000 {
        let record = builder.build(
            LogLevel::Info,
            &Message::from("tick"),
            LogMetadata::new(),
            SourceLocation::from_caller(std::panic::Location::caller()),
        );
        assert!(!record.correlation_id().is_empty());
        assert!(seen.insert(record.correlation_id().to_string()));
    }
}

#[derive(Clone, Default)]
struct RecordingStore {
    documents: Arc<Mutex<Vec<(String, Value)>>>,
}

impl DocumentStore for RecordingStore {
    fn insert_one(&mut self, collection: &str, document: Value) -> Result<()> {
        self.documents.lock().push((collection.to_string(), document));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingStream {
    events: Arc<Mutex<Vec<String>>>,
}

impl LogStreamClient for RecordingStream {
    fn put_log_event(&mut self, _target: &AggregatorTarget, _ts: i64, message: &str) -> Result<()> {
        self.events.lock().push(message.to_string());
        Ok(())
    }
}

#[test]
fn test_from_config_builds_every_sink() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("configured.log");

    let config: LoggerConfig = serde_json::from_value(json!({
        "min_level": "DEBUG",
        "sinks": {
            "file": {"path": log_file},
            "aggregator": {"group": "my-log-group", "stream": "my-log-stream", "region": "us-east-1"},
            "document_store": {"uri": "mongodb://localhost:27017/", "database": "logs_db", "collection": "logs"}
        },
        "dispatcher": {"queue_capacity": 128}
    }))
    .unwrap();

    let store = RecordingStore::default();
    let stream = RecordingStream::default();
    let clients = SinkClients::new()
        .document_store(store.clone())
        .aggregator(stream.clone());

    let mut logger = Logger::from_config(config, clients).unwrap();
    assert_eq!(logger.sink_names(), vec!["file", "aggregator", "document_store"]);

    logger.debug_with_metadata("payment by jane@corp.io", LogMetadata::new().user_id("77"));
    let report = logger.shutdown(Duration::from_secs(5));
    assert!(report.completed);
    assert_eq!(report.total_delivered(), 3);

    let documents = store.documents.lock();
    assert_eq!(documents[0].0, "logs");
    assert_eq!(documents[0].1["message"], "payment by *****");
    assert_eq!(documents[0].1["level"], "DEBUG");

    let events = stream.events.lock();
    let event: Value = serde_json::from_str(&events[0]).unwrap();
    assert_eq!(event["user_id"], "77");

    assert!(!fs::read_to_string(&log_file).unwrap().contains("jane@corp.io"));
}

#[test]
fn test_from_config_rejects_invalid_configuration() {
    let empty = LoggerConfig::default();
    assert!(matches!(
        Logger::from_config(empty, SinkClients::new()),
        Err(LoggerError::InvalidConfiguration { .. })
    ));

    let config: LoggerConfig = serde_json::from_value(json!({
        "sinks": {
            "document_store": {"uri": "mongodb://localhost:27017/", "database": "logs_db", "collection": "logs"}
        }
    }))
    .unwrap();
    let err = Logger::from_config(config, SinkClients::new()).err().unwrap();
    assert!(err.to_string().contains("document store"));
}

#[cfg(feature = "async-context")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_task_scoped_correlation() {
    let (sink, handle) = memory_sink("memory");
    let logger = Arc::new(Logger::builder().sink(sink).build().unwrap());

    let mut tasks = Vec::new();
    for unit in ["task-A", "task-B"] {
        let logger = Arc::clone(&logger);
        tasks.push(tokio::spawn(CorrelationContext::scope(unit, async move {
            for i in 0..50 {
                logger.info(format!("{} step {}", unit, i));
                tokio::task::yield_now().await;
            }
        })));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut logger = Arc::try_unwrap(logger).ok().expect("no other references");
    logger.shutdown(Duration::from_secs(5));

    let records = handle.records();
    assert_eq!(records.len(), 100);
    for record in &records {
        let unit = record.message().split(' ').next().unwrap();
        assert_eq!(record.correlation_id(), unit);
    }
}
