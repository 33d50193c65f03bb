//! Document store sink
//!
//! Inserts each record as a flat document (see [`LogRecord::to_document`])
//! into a collection. The store driver is supplied by the application.

use crate::core::config::DocumentStoreConfig;
use crate::core::{LogRecord, LoggerError, Result, Sink};
use serde_json::Value;

/// Minimal document database contract
pub trait DocumentStore: Send {
    fn insert_one(&mut self, collection: &str, document: Value) -> Result<()>;
}

impl<D: DocumentStore + ?Sized> DocumentStore for Box<D> {
    fn insert_one(&mut self, collection: &str, document: Value) -> Result<()> {
        (**self).insert_one(collection, document)
    }
}

pub struct DocumentStoreSink {
    collection: String,
    store: Box<dyn DocumentStore>,
}

impl DocumentStoreSink {
    pub fn new(collection: impl Into<String>, store: impl DocumentStore + 'static) -> Self {
        Self {
            collection: collection.into(),
            store: Box::new(store),
        }
    }

    pub fn from_config(config: &DocumentStoreConfig, store: Box<dyn DocumentStore>) -> Self {
        Self {
            collection: config.collection.clone(),
            store,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl Sink for DocumentStoreSink {
    fn submit(&mut self, record: &LogRecord) -> Result<()> {
        self.store
            .insert_one(&self.collection, record.to_document())
            .map_err(|e| LoggerError::sink("document_store", format!("{}: {}", self.collection, e)))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "document_store"
    }
}
