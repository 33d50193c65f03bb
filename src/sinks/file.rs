//! File sink implementation
//!
//! Appends the JSON wire form, one record per line. Lines collect in an
//! in-memory buffer and only reach the file while it is exclusively locked
//! (with the `file` feature), so several processes can share one log file
//! without interleaving partial lines.

use crate::core::config::FileConfig;
use crate::core::{LogRecord, LoggerError, Result, Sink};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) the file in append mode, creating parent directories
    ///
    /// # Example
    ///
    /// ```no_run
    /// use masked_logger::sinks::FileSink;
    ///
    /// let sink = FileSink::new("logs/app.log").unwrap();
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "creating log directory",
                        parent.display().to_string(),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening log file", path.display().to_string(), e)
            })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn from_config(config: &FileConfig) -> Result<Self> {
        Self::new(config.path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run a write against the file while holding its exclusive lock
#[cfg(feature = "file")]
fn locked<T>(
    writer: &mut BufWriter<File>,
    op: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<T>,
) -> std::io::Result<T> {
    use fs2::FileExt;

    writer.get_ref().lock_exclusive()?;
    let result = op(writer);
    let unlock = writer.get_ref().unlock();
    let value = result?;
    unlock?;
    Ok(value)
}

#[cfg(not(feature = "file"))]
fn locked<T>(
    writer: &mut BufWriter<File>,
    op: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<T>,
) -> std::io::Result<T> {
    op(writer)
}

impl FileSink {
    fn io_error(&self, e: std::io::Error) -> LoggerError {
        LoggerError::file_sink(self.path.display().to_string(), e.to_string())
    }
}

impl Sink for FileSink {
    fn submit(&mut self, record: &LogRecord) -> Result<()> {
        let mut line = record.to_json_string();
        line.push('\n');
        let bytes = line.as_bytes();

        let result = if self.writer.buffer().len() + bytes.len() <= self.writer.capacity() {
            // Fits in the buffer, no I/O yet
            self.writer.write_all(bytes)
        } else {
            locked(&mut self.writer, |w| {
                w.flush()?;
                w.write_all(bytes)?;
                w.flush()
            })
        };

        result.map_err(|e| self.io_error(e))
    }

    fn flush(&mut self) -> Result<()> {
        locked(&mut self.writer, |w| w.flush()).map_err(|e| self.io_error(e))
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}
