//! In-memory sink
//!
//! Keeps every delivered record in a shared buffer. Useful in tests and for
//! embedding applications that want to inspect recent log output.

use crate::core::{LogRecord, Result, Sink};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable read handle onto a [`MemorySink`]'s buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryHandle {
    /// Copy of everything delivered so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

pub struct MemorySink {
    name: String,
    handle: MemoryHandle,
}

impl MemorySink {
    /// # Example
    ///
    /// ```
    /// use masked_logger::sinks::MemorySink;
    ///
    /// let sink = MemorySink::new("capture");
    /// let handle = sink.handle();
    /// assert!(handle.is_empty());
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: MemoryHandle::default(),
        }
    }

    pub fn handle(&self) -> MemoryHandle {
        self.handle.clone()
    }
}

impl Sink for MemorySink {
    fn submit(&mut self, record: &LogRecord) -> Result<()> {
        self.handle.records.lock().push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
