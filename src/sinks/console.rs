//! Console sink implementation

use crate::core::config::{ConsoleConfig, ConsoleFormat};
use crate::core::log_record::sanitize_line;
use crate::core::{LogRecord, Result, Sink, TimestampFormat};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;

pub struct ConsoleSink {
    format: ConsoleFormat,
    use_colors: bool,
    timestamp_format: TimestampFormat,
}

impl ConsoleSink {
    /// Console sink printing the JSON wire form
    pub fn new() -> Self {
        Self {
            format: ConsoleFormat::Json,
            use_colors: false,
            timestamp_format: TimestampFormat::default(),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self {
            format: config.format,
            use_colors: config.colors,
            timestamp_format: config.timestamp_format.clone(),
        }
    }

    /// Human readable output
    ///
    /// # Example
    ///
    /// ```
    /// use masked_logger::sinks::ConsoleSink;
    ///
    /// let sink = ConsoleSink::text(false);
    /// ```
    pub fn text(use_colors: bool) -> Self {
        Self {
            format: ConsoleFormat::Text,
            use_colors,
            timestamp_format: TimestampFormat::default(),
        }
    }

    /// Set the timestamp format used by text output
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Render a record the way this sink prints it
    pub fn render(&self, record: &LogRecord) -> String {
        match self.format {
            ConsoleFormat::Json => record.to_json_string(),
            ConsoleFormat::Text => self.format_text(record),
        }
    }

    /// Format as text with optional colors
    fn format_text(&self, record: &LogRecord) -> String {
        let level_str = format!("{:8}", record.level().to_str());
        #[cfg(feature = "console")]
        let level_str = if self.use_colors {
            level_str.color(record.level().color_code()).to_string()
        } else {
            level_str
        };

        let location = record.location();
        let mut line = format!(
            "[{}] [{}] [{}] {}:{} {} (user={} correlation={})",
            self.timestamp_format.format(&record.timestamp()),
            level_str,
            location.thread,
            location.module,
            location.line,
            sanitize_line(record.message()),
            record.user_id(),
            record.correlation_id(),
        );

        if let Some(elapsed) = record.execution_time() {
            line.push_str(&format!(" took={:.6}s", elapsed.as_secs_f64()));
        }

        if !record.extra().is_empty() {
            line.push(' ');
            line.push_str(&sanitize_line(&record.extra().format_fields()));
        }

        line
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn submit(&mut self, record: &LogRecord) -> Result<()> {
        let output = self.render(record);

        // Route Error and Critical levels to stderr, others to stdout
        if record.level().is_failure() {
            writeln!(std::io::stderr().lock(), "{}", output)?;
        } else {
            writeln!(std::io::stdout().lock(), "{}", output)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Flush both stdout and stderr since we write to both
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
