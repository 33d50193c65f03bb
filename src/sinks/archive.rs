//! Background archiving of finished log files
//!
//! A [`LogArchiver`] owns one worker thread that hands file paths to an
//! [`ArchiveUploader`] (an object-storage client supplied by the
//! application). Queuing a file never waits for the upload.

use super::file::FileSink;
use crate::core::config::DEFAULT_SHUTDOWN_TIMEOUT;
use crate::core::{LoggerError, Result};
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Files waiting for upload before new ones are refused
const ARCHIVE_QUEUE_CAPACITY: usize = 64;

/// Client for an object store that keeps archived log files
///
/// Called only from the archiver's worker thread, so implementations may block.
pub trait ArchiveUploader: Send {
    /// Upload the file at `path` to `bucket` under `key`
    fn upload(&mut self, path: &Path, bucket: &str, key: &str) -> Result<()>;
}

impl<U: ArchiveUploader + ?Sized> ArchiveUploader for Box<U> {
    fn upload(&mut self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        (**self).upload(path, bucket, key)
    }
}

/// Counters for an archiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub uploaded: u64,
    pub failed: u64,
    /// Files refused because the queue was full
    pub dropped: u64,
}

#[derive(Default)]
struct ArchiveCounters {
    uploaded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Uploads log files on a background thread
///
/// # Example
///
/// ```
/// use masked_logger::sinks::{ArchiveUploader, LogArchiver};
/// use masked_logger::Result;
/// use std::path::Path;
/// use std::time::Duration;
///
/// struct PrintUploader;
///
/// impl ArchiveUploader for PrintUploader {
///     fn upload(&mut self, path: &Path, bucket: &str, key: &str) -> Result<()> {
///         println!("{} -> {}/{}", path.display(), bucket, key);
///         Ok(())
///     }
/// }
///
/// let mut archiver = LogArchiver::new("app-logs", PrintUploader).unwrap();
/// archiver.archive("logs/app.log").unwrap();
/// assert!(archiver.shutdown(Duration::from_secs(1)));
/// ```
pub struct LogArchiver {
    bucket: String,
    sender: Option<Sender<(PathBuf, String)>>,
    counters: Arc<ArchiveCounters>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LogArchiver {
    pub fn new(bucket: impl Into<String>, uploader: impl ArchiveUploader + 'static) -> Result<Self> {
        Self::with_boxed_uploader(bucket, Box::new(uploader))
    }

    pub fn with_boxed_uploader(
        bucket: impl Into<String>,
        mut uploader: Box<dyn ArchiveUploader>,
    ) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(LoggerError::config("archive", "bucket must not be empty"));
        }

        let (sender, receiver) = bounded::<(PathBuf, String)>(ARCHIVE_QUEUE_CAPACITY);
        let counters = Arc::new(ArchiveCounters::default());
        let worker_counters = Arc::clone(&counters);
        let worker_bucket = bucket.clone();

        let handle = thread::Builder::new()
            .name("log-archiver".to_string())
            .spawn(move || {
                for (path, key) in receiver {
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        uploader.upload(&path, &worker_bucket, &key)
                    }));
                    match result {
                        Ok(Ok(())) => {
                            worker_counters.uploaded.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(Err(e)) => {
                            worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                            eprintln!(
                                "[LOGGER ERROR] Upload of '{}' to '{}' failed: {}",
                                path.display(),
                                worker_bucket,
                                e
                            );
                        }
                        Err(_) => {
                            worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                            eprintln!(
                                "[LOGGER CRITICAL] Uploader panicked on '{}'",
                                path.display()
                            );
                        }
                    }
                }
            })
            .map_err(|e| LoggerError::io_operation("spawning archiver", bucket.clone(), e))?;

        Ok(Self {
            bucket,
            sender: Some(sender),
            counters,
            handle: Some(handle),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Queue a file for upload under its file name and return immediately
    pub fn archive(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let key = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LoggerError::config("archive", format!("'{}' has no file name", path.display()))
            })?;

        let Some(sender) = self.sender.as_ref() else {
            return Err(LoggerError::sink("archive", "archiver is shut down"));
        };

        match sender.try_send((path, key)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full((path, _))) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(LoggerError::sink(
                    "archive",
                    format!("upload queue full, '{}' not archived", path.display()),
                ))
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(LoggerError::sink("archive", "archiver worker has stopped"))
            }
        }
    }

    pub fn stats(&self) -> ArchiveStats {
        ArchiveStats {
            uploaded: self.counters.uploaded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting files and wait for queued uploads
    ///
    /// Returns `false` if uploads were still running when `timeout` expired;
    /// the worker is then detached.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        self.sender = None;

        let Some(handle) = self.handle.take() else {
            return true;
        };

        let start = Instant::now();
        while !handle.is_finished() {
            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Archiver did not finish within {:?} timeout. \
                     Some uploads may be lost.",
                    timeout
                );
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let _ = handle.join();
        true
    }
}

impl Drop for LogArchiver {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

impl FileSink {
    /// Flush buffered lines and queue the file for upload
    pub fn archive(&mut self, archiver: &LogArchiver) -> Result<()> {
        crate::core::Sink::flush(self)?;
        archiver.archive(self.path().to_path_buf())
    }
}
