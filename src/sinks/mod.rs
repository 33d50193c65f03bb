//! Sink implementations

pub mod aggregator;
pub mod archive;
pub mod console;
pub mod document_store;
pub mod file;
pub mod memory;

pub use aggregator::{AggregatorTarget, CloudAggregatorSink, LogStreamClient};
pub use archive::{ArchiveStats, ArchiveUploader, LogArchiver};
pub use console::ConsoleSink;
pub use document_store::{DocumentStore, DocumentStoreSink};
pub use file::FileSink;
pub use memory::{MemoryHandle, MemorySink};

pub use crate::core::Sink;
