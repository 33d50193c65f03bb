//! Resolved logger configuration
//!
//! These structs are plain data: an application loads them however it likes
//! (they derive `Deserialize`), then hands them to
//! [`Logger::from_config`](super::logger::Logger::from_config). Validation
//! happens once, at startup.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::overflow_policy::OverflowPolicy;
use super::redactor::RedactionConfig;
use super::timestamp::TimestampFormat;
use crate::sinks::{DocumentStore, LogStreamClient};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default bounded queue size per sink
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// Default time a shutdown waits for queued records
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How the console sink renders records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// Wire form, one JSON object per line
    #[default]
    Json,
    /// Human readable line
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub format: ConsoleFormat,
    pub colors: bool,
    pub timestamp_format: TimestampFormat,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            format: ConsoleFormat::Json,
            colors: true,
            timestamp_format: TimestampFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub path: PathBuf,
}

/// Cloud log aggregator destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub group: String,
    pub stream: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// Enabled sinks; `None` means disabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub console: Option<ConsoleConfig>,
    pub file: Option<FileConfig>,
    pub aggregator: Option<AggregatorConfig>,
    pub document_store: Option<DocumentStoreConfig>,
}

impl SinkConfig {
    pub fn enabled_count(&self) -> usize {
        [
            self.console.is_some(),
            self.file.is_some(),
            self.aggregator.is_some(),
            self.document_store.is_some(),
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count()
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled_count() == 0 {
            return Err(LoggerError::config("sinks", "no sink is enabled"));
        }

        if let Some(file) = &self.file {
            if file.path.as_os_str().is_empty() {
                return Err(LoggerError::config("file sink", "path is empty"));
            }
        }

        if let Some(aggregator) = &self.aggregator {
            require("aggregator sink", "group", &aggregator.group)?;
            require("aggregator sink", "stream", &aggregator.stream)?;
            require("aggregator sink", "region", &aggregator.region)?;
        }

        if let Some(store) = &self.document_store {
            require("document store sink", "uri", &store.uri)?;
            require("document store sink", "database", &store.database)?;
            require("document store sink", "collection", &store.collection)?;
        }

        Ok(())
    }
}

fn require(component: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(LoggerError::config(component, format!("{} is empty", field)))
    } else {
        Ok(())
    }
}

/// Queueing and backpressure settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Used when the dispatcher is dropped without an explicit shutdown
    pub shutdown_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "dispatcher",
                "queue capacity must be greater than zero",
            ));
        }
        if let OverflowPolicy::BlockWithTimeout(timeout) = self.overflow_policy {
            if timeout.is_zero() {
                return Err(LoggerError::config(
                    "dispatcher",
                    "block timeout must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

/// Everything needed to build a [`Logger`](super::logger::Logger)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub redaction: RedactionConfig,
    pub sinks: SinkConfig,
    pub dispatcher: DispatcherConfig,
}

impl LoggerConfig {
    pub fn validate(&self) -> Result<()> {
        self.sinks.validate()?;
        self.dispatcher.validate()
    }
}

/// Clients for remote sinks, supplied by the application
///
/// The crate does not ship network clients; an enabled aggregator or
/// document store sink needs the matching client here.
#[derive(Default)]
pub struct SinkClients {
    pub aggregator: Option<Box<dyn LogStreamClient>>,
    pub document_store: Option<Box<dyn DocumentStore>>,
}

impl SinkClients {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn aggregator(mut self, client: impl LogStreamClient + 'static) -> Self {
        self.aggregator = Some(Box::new(client));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn document_store(mut self, store: impl DocumentStore + 'static) -> Self {
        self.document_store = Some(Box::new(store));
        self
    }
}
