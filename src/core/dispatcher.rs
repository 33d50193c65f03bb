//! Non-blocking fan-out of log records to sinks
//!
//! Every sink gets its own bounded queue and one dedicated worker thread.
//! A slow or failing sink therefore never delays its siblings, and each sink
//! sees records in the order they were dispatched. Queue overflow is handled
//! by the configured [`OverflowPolicy`].

use super::{
    config::DispatcherConfig,
    error::{LoggerError, Result},
    log_record::LogRecord,
    metrics::{DispatchReport, SinkMetrics, SinkStats},
    overflow_policy::{OutcomeCallback, OverflowCallback, OverflowPolicy},
    sink::{Sink, SinkOutcome},
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Maximum records submitted between two flushes of a sink
const BATCH_SIZE: usize = 64;

type Job = Arc<LogRecord>;

/// One sink's queue and worker
struct SinkWorker {
    name: String,
    sender: Option<Sender<Job>>,
    /// Kept for oldest-first eviction and for draining leftovers on shutdown
    receiver: Receiver<Job>,
    metrics: Arc<SinkMetrics>,
    abandon: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SinkWorker {
    fn spawn(
        sink: Box<dyn Sink>,
        queue_capacity: usize,
        on_outcome: Option<OutcomeCallback>,
    ) -> Result<Self> {
        let name = sink.name().to_string();
        let (sender, receiver) = bounded(queue_capacity);
        let metrics = Arc::new(SinkMetrics::new());
        let abandon = Arc::new(AtomicBool::new(false));

        let worker_rx = receiver.clone();
        let worker_metrics = Arc::clone(&metrics);
        let worker_abandon = Arc::clone(&abandon);

        let handle = thread::Builder::new()
            .name(format!("log-sink-{}", name))
            .spawn(move || {
                run_worker(sink, worker_rx, worker_metrics, worker_abandon, on_outcome)
            })
            .map_err(|e| {
                LoggerError::io_operation("spawning sink worker", format!("sink '{}'", name), e)
            })?;

        Ok(Self {
            name,
            sender: Some(sender),
            receiver,
            metrics,
            abandon,
            handle: Some(handle),
        })
    }

    fn offer(
        &self,
        job: Job,
        policy: &OverflowPolicy,
        deadline: Option<Instant>,
        on_overflow: Option<&OverflowCallback>,
    ) {
        let Some(sender) = self.sender.as_ref() else {
            self.metrics.record_dropped();
            return;
        };

        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                self.handle_overflow(sender, job, policy, deadline, on_overflow);
            }
            Err(TrySendError::Disconnected(_)) => {
                // Worker thread is gone
                self.metrics.record_dropped();
            }
        }
    }

    fn handle_overflow(
        &self,
        sender: &Sender<Job>,
        job: Job,
        policy: &OverflowPolicy,
        deadline: Option<Instant>,
        on_overflow: Option<&OverflowCallback>,
    ) {
        self.metrics.record_queue_full();

        match policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
            }

            OverflowPolicy::DropOldest => {
                if self.receiver.try_recv().is_ok() {
                    self.metrics.record_dropped();
                }
                if sender.try_send(job).is_err() {
                    // Refilled by a concurrent producer
                    self.metrics.record_dropped();
                }
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                let sent = match deadline {
                    Some(deadline) => sender.send_deadline(job, deadline),
                    None => sender.send_timeout(job, *timeout),
                };
                match sent {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.alert_and_drop(on_overflow);
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {
                        self.metrics.record_dropped();
                    }
                }
            }

            OverflowPolicy::AlertAndDrop => {
                self.alert_and_drop(on_overflow);
            }
        }
    }

    /// Drop a record with alert notification
    fn alert_and_drop(&self, on_overflow: Option<&OverflowCallback>) {
        let dropped_count = self.metrics.record_dropped();

        // Alert on first drop and periodically thereafter
        let should_alert = dropped_count == 0 || (dropped_count + 1) % 1000 == 0;

        if should_alert {
            eprintln!(
                "[LOGGER WARNING] Queue for sink '{}' full, {} records dropped. \
                 Consider increasing queue capacity or using a different overflow policy.",
                self.name,
                dropped_count + 1
            );

            if let Some(callback) = on_overflow {
                callback(dropped_count + 1);
            }
        }
    }

    /// Close the queue so the worker exits once it has drained it
    fn close(&mut self) {
        drop(self.sender.take());
    }

    /// Tell the worker to stop and count everything still queued as dropped
    fn abandon(&mut self) {
        self.abandon.store(true, Ordering::Release);
        let mut leftover = 0;
        while self.receiver.try_recv().is_ok() {
            leftover += 1;
        }
        self.metrics.record_dropped_many(leftover);
        if leftover > 0 {
            eprintln!(
                "[LOGGER WARNING] Sink '{}' did not drain in time, {} records abandoned.",
                self.name, leftover
            );
        }
        // The thread is detached; it exits after its current submit
        self.handle.take();
    }

    fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                eprintln!(
                    "[LOGGER ERROR] Worker for sink '{}' panicked during shutdown: {:?}",
                    self.name, e
                );
            }
        }
    }

    fn stats(&self) -> SinkStats {
        self.metrics.snapshot(&self.name)
    }
}

/// Worker loop: submit records in queue order, flushing once the queue runs
/// dry or every `BATCH_SIZE` records
///
/// Records stay in the channel until they are submitted, so an abandoned
/// shutdown can count everything not yet handed to the sink.
fn run_worker(
    mut sink: Box<dyn Sink>,
    receiver: Receiver<Job>,
    metrics: Arc<SinkMetrics>,
    abandon: Arc<AtomicBool>,
    on_outcome: Option<OutcomeCallback>,
) {
    let name = sink.name().to_string();
    let mut unflushed = 0usize;

    // recv fails only once every sender is gone and the queue is empty
    while let Ok(job) = receiver.recv() {
        if abandon.load(Ordering::Acquire) {
            metrics.record_dropped();
            break;
        }

        let outcome = submit_isolated(&mut sink, &job);
        match &outcome {
            SinkOutcome::Delivered => {
                metrics.record_delivered();
            }
            SinkOutcome::Failed { reason } => {
                metrics.record_failed();
                eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", name, reason);
            }
        }

        if let Some(ref callback) = on_outcome {
            callback(&name, &outcome);
        }

        unflushed += 1;
        if unflushed >= BATCH_SIZE || receiver.is_empty() {
            flush_isolated(&mut sink, &name);
            unflushed = 0;
        }

        if abandon.load(Ordering::Acquire) {
            return;
        }
    }

    flush_isolated(&mut sink, &name);
}

/// Submit one record, converting errors and panics into an outcome
fn submit_isolated(sink: &mut Box<dyn Sink>, record: &LogRecord) -> SinkOutcome {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.submit(record)));

    match result {
        Ok(Ok(())) => SinkOutcome::Delivered,
        Ok(Err(e)) => SinkOutcome::Failed {
            reason: e.to_string(),
        },
        Err(panic_info) => SinkOutcome::Failed {
            reason: format!("panicked: {}", panic_message(panic_info.as_ref())),
        },
    }
}

fn flush_isolated(sink: &mut Box<dyn Sink>, name: &str) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.flush()));

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("[LOGGER ERROR] Sink '{}' flush failed: {}", name, e);
        }
        Err(panic_info) => {
            eprintln!(
                "[LOGGER CRITICAL] Sink '{}' panicked during flush: {}. \
                 Other sinks continue to function.",
                name,
                panic_message(panic_info.as_ref())
            );
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Fans records out to every configured sink without blocking the caller
///
/// # Example
///
/// ```
/// use masked_logger::{DispatcherConfig, Dispatcher, MemorySink, RecordBuilder, LogLevel, LogMetadata, Message, SourceLocation};
/// use std::time::Duration;
///
/// let sink = MemorySink::new("memory");
/// let records = sink.handle();
/// let mut dispatcher = Dispatcher::new(vec![Box::new(sink)], DispatcherConfig::default()).unwrap();
///
/// let record = RecordBuilder::default().build(
///     LogLevel::Info,
///     &Message::from("hello"),
///     LogMetadata::new(),
///     SourceLocation::from_caller(std::panic::Location::caller()),
/// );
/// dispatcher.dispatch(record);
///
/// let report = dispatcher.shutdown(Duration::from_secs(1));
/// assert!(report.completed);
/// assert_eq!(records.len(), 1);
/// ```
pub struct Dispatcher {
    workers: Vec<SinkWorker>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    shutdown_timeout: Duration,
    closed: bool,
    /// Outcome of the first shutdown
    completed: bool,
    rejected: AtomicU64,
}

impl Dispatcher {
    /// Start one worker per sink
    pub fn new(sinks: Vec<Box<dyn Sink>>, config: DispatcherConfig) -> Result<Self> {
        Self::with_callbacks(sinks, config, None, None)
    }

    /// Start one worker per sink with optional overflow and outcome callbacks
    pub fn with_callbacks(
        sinks: Vec<Box<dyn Sink>>,
        config: DispatcherConfig,
        on_overflow: Option<OverflowCallback>,
        on_outcome: Option<OutcomeCallback>,
    ) -> Result<Self> {
        config.validate()?;
        if sinks.is_empty() {
            return Err(LoggerError::config("dispatcher", "at least one sink is required"));
        }

        let mut workers = Vec::with_capacity(sinks.len());
        for sink in sinks {
            workers.push(SinkWorker::spawn(
                sink,
                config.queue_capacity,
                on_outcome.clone(),
            )?);
        }

        Ok(Self {
            workers,
            overflow_policy: config.overflow_policy,
            on_overflow,
            shutdown_timeout: config.shutdown_timeout,
            closed: false,
            completed: false,
            rejected: AtomicU64::new(0),
        })
    }

    /// Queue a record for every sink and return immediately
    pub fn dispatch(&self, record: LogRecord) {
        if self.closed {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }

        // One wait budget for the whole fan-out, not one per sink
        let deadline = match &self.overflow_policy {
            OverflowPolicy::BlockWithTimeout(timeout) => Instant::now().checked_add(*timeout),
            _ => None,
        };

        let job = Arc::new(record);
        for worker in &self.workers {
            worker.offer(
                Arc::clone(&job),
                &self.overflow_policy,
                deadline,
                self.on_overflow.as_ref(),
            );
        }
    }

    /// Names of the configured sinks, in dispatch order
    pub fn sink_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name.as_str()).collect()
    }

    /// Snapshot of every sink's counters
    pub fn metrics(&self) -> Vec<SinkStats> {
        self.workers.iter().map(SinkWorker::stats).collect()
    }

    /// Records offered after shutdown
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop accepting records and wait for queued ones to be delivered
    ///
    /// Waits at most `timeout`. Records still queued when it expires are
    /// abandoned and counted as dropped. Calling it again returns the current
    /// counters with the outcome of the first call.
    pub fn shutdown(&mut self, timeout: Duration) -> DispatchReport {
        if self.closed {
            return self.report(self.completed);
        }
        self.closed = true;

        for worker in &mut self.workers {
            worker.close();
        }

        let start = Instant::now();
        loop {
            if self.workers.iter().all(SinkWorker::is_finished) {
                for worker in &mut self.workers {
                    worker.join();
                }
                self.completed = true;
                return self.report(true);
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Sink workers did not finish within {:?} timeout. \
                     Some records may be lost.",
                    timeout
                );
                for worker in &mut self.workers {
                    if worker.is_finished() {
                        worker.join();
                    } else {
                        worker.abandon();
                    }
                }
                return self.report(false);
            }

            // Small sleep to avoid busy-waiting
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn report(&self, completed: bool) -> DispatchReport {
        DispatchReport {
            completed,
            rejected: self.rejected_count(),
            sinks: self.metrics(),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let report = self.shutdown(self.shutdown_timeout);

        // Report any dropped records
        let dropped = report.total_dropped();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Dispatcher shutting down with {} dropped records",
                dropped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_context::LogMetadata;
    use crate::core::log_level::LogLevel;
    use crate::core::log_record::{Message, SourceLocation};
    use crate::core::record_builder::RecordBuilder;
    use crate::sinks::MemorySink;
    use std::sync::atomic::AtomicUsize;

    fn record(text: &str) -> LogRecord {
        RecordBuilder::default().build(
            LogLevel::Info,
            &Message::from(text),
            LogMetadata::new(),
            SourceLocation::from_caller(std::panic::Location::caller()),
        )
    }

    struct GatedSink {
        gate: Receiver<()>,
        seen: Arc<AtomicUsize>,
    }

    impl Sink for GatedSink {
        fn submit(&mut self, _record: &LogRecord) -> Result<()> {
            let _ = self.gate.recv();
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    fn config(capacity: usize, policy: OverflowPolicy) -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: capacity,
            overflow_policy: policy,
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_a_sink() {
        let result = Dispatcher::new(Vec::new(), DispatcherConfig::default());
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_delivers_in_order() {
        let sink = MemorySink::new("memory");
        let handle = sink.handle();
        let mut dispatcher =
            Dispatcher::new(vec![Box::new(sink)], DispatcherConfig::default()).unwrap();

        for i in 0..200 {
            dispatcher.dispatch(record(&format!("message {}", i)));
        }
        let report = dispatcher.shutdown(Duration::from_secs(5));

        assert!(report.completed);
        let messages: Vec<String> = handle.records().iter().map(|r| r.message().to_string()).collect();
        let expected: Vec<String> = (0..200).map(|i| format!("message {}", i)).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn test_drop_newest_counts_overflow() {
        let (gate_tx, gate_rx) = bounded(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = GatedSink { gate: gate_rx, seen: Arc::clone(&seen) };
        let mut dispatcher =
            Dispatcher::new(vec![Box::new(sink)], config(2, OverflowPolicy::DropNewest)).unwrap();

        // First record is taken by the worker (blocked on the gate),
        // the next two fill the queue, the rest overflow.
        dispatcher.dispatch(record("0"));
        thread::sleep(Duration::from_millis(50));
        for i in 1..6 {
            dispatcher.dispatch(record(&i.to_string()));
        }

        let stats = &dispatcher.metrics()[0];
        assert_eq!(stats.dropped, 3);
        assert_eq!(stats.queue_full_events, 3);

        drop(gate_tx);
        let report = dispatcher.shutdown(Duration::from_secs(5));
        assert!(report.completed);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_drop_oldest_keeps_latest() {
        let (gate_tx, gate_rx) = bounded::<()>(0);
        let sink = MemorySink::new("memory");
        let handle = sink.handle();

        struct Blocking {
            inner: MemorySink,
            gate: Receiver<()>,
        }
        impl Sink for Blocking {
            fn submit(&mut self, record: &LogRecord) -> Result<()> {
                let _ = self.gate.recv();
                self.inner.submit(record)
            }
            fn flush(&mut self) -> Result<()> {
                Ok(())
            }
            fn name(&self) -> &str {
                "blocking"
            }
        }

        let mut dispatcher = Dispatcher::new(
            vec![Box::new(Blocking { inner: sink, gate: gate_rx })],
            config(2, OverflowPolicy::DropOldest),
        )
        .unwrap();

        dispatcher.dispatch(record("first"));
        thread::sleep(Duration::from_millis(50));
        for text in ["a", "b", "c", "d"] {
            dispatcher.dispatch(record(text));
        }

        drop(gate_tx);
        dispatcher.shutdown(Duration::from_secs(5));

        let messages: Vec<String> = handle.records().iter().map(|r| r.message().to_string()).collect();
        assert_eq!(messages, vec!["first", "c", "d"]);
        assert_eq!(dispatcher.metrics()[0].dropped, 2);
    }

    #[test]
    fn test_shutdown_timeout_abandons_queue() {
        let (_gate_tx, gate_rx) = bounded::<()>(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = GatedSink { gate: gate_rx, seen };
        let mut dispatcher =
            Dispatcher::new(vec![Box::new(sink)], config(16, OverflowPolicy::DropNewest)).unwrap();

        for i in 0..5 {
            dispatcher.dispatch(record(&i.to_string()));
        }
        thread::sleep(Duration::from_millis(50));

        let report = dispatcher.shutdown(Duration::from_millis(100));
        assert!(!report.completed);
        // One record is stuck inside submit, the other four were abandoned
        assert_eq!(report.sinks[0].dropped, 4);
    }

    #[test]
    fn test_rejects_after_shutdown() {
        let mut dispatcher =
            Dispatcher::new(vec![Box::new(MemorySink::new("m"))], DispatcherConfig::default())
                .unwrap();
        dispatcher.shutdown(Duration::from_secs(1));

        dispatcher.dispatch(record("late"));
        assert_eq!(dispatcher.rejected_count(), 1);
        assert!(dispatcher.shutdown(Duration::from_secs(1)).completed);
    }

    #[test]
    fn test_repeated_shutdown_keeps_timed_out_outcome() {
        let (_gate_tx, gate_rx) = bounded::<()>(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = GatedSink { gate: gate_rx, seen };
        let mut dispatcher =
            Dispatcher::new(vec![Box::new(sink)], config(16, OverflowPolicy::DropNewest)).unwrap();

        for i in 0..3 {
            dispatcher.dispatch(record(&i.to_string()));
        }

        let first = dispatcher.shutdown(Duration::from_millis(50));
        let second = dispatcher.shutdown(Duration::from_millis(50));
        assert!(!first.completed);
        assert!(!second.completed);
        assert_eq!(second.sinks[0].dropped, first.sinks[0].dropped);
    }

    #[test]
    fn test_block_with_timeout_shares_one_deadline() {
        let (_gate_tx, gate_rx) = bounded::<()>(0);
        let sinks: Vec<Box<dyn Sink>> = (0..2)
            .map(|_| {
                Box::new(GatedSink {
                    gate: gate_rx.clone(),
                    seen: Arc::new(AtomicUsize::new(0)),
                }) as Box<dyn Sink>
            })
            .collect();
        let timeout = Duration::from_millis(200);
        let mut dispatcher =
            Dispatcher::new(sinks, config(1, OverflowPolicy::BlockWithTimeout(timeout))).unwrap();

        // Each worker holds one record inside submit and one in its queue
        dispatcher.dispatch(record("held"));
        thread::sleep(Duration::from_millis(50));
        dispatcher.dispatch(record("queued"));

        let start = Instant::now();
        dispatcher.dispatch(record("overflow"));
        let elapsed = start.elapsed();

        assert!(elapsed >= timeout);
        assert!(elapsed < timeout * 2, "blocked for {:?}", elapsed);
        for stats in dispatcher.metrics() {
            assert_eq!(stats.dropped, 1);
        }
        dispatcher.shutdown(Duration::from_millis(50));
    }
}
