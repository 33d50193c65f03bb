//! Logging macros for ergonomic log message formatting.
//!
//! Unlike the plain [`Logger`](crate::Logger) methods, the macros record the
//! caller's module path and function name in the record's source location.
//!
//! # Examples
//!
//! ```
//! use masked_logger::prelude::*;
//! use masked_logger::info;
//!
//! let logger = Logger::builder().sink(MemorySink::new("m")).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With metadata
//! info!(logger, meta = LogMetadata::new().user_id("42"); "User {} logged in", 42);
//! ```

/// Name of the enclosing function, without its module path
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __here() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(__here);
        let name = name.strip_suffix("::__here").unwrap_or(name);
        let name = name.trim_end_matches("::{{closure}}");
        match name.rfind("::") {
            Some(pos) => &name[pos + 2..],
            None => name,
        }
    }};
}

/// Source location of the macro call site
#[doc(hidden)]
#[macro_export]
macro_rules! __call_site {
    () => {
        $crate::SourceLocation::from_caller(::std::panic::Location::caller())
            .with_module(::std::module_path!())
            .with_function($crate::function_name!())
    };
}

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use masked_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new("m")).build().unwrap();
/// use masked_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Info, meta = LogMetadata::new().user_id("7"); "With metadata");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, meta = $metadata:expr; $($arg:tt)+) => {{
        let level = $level;
        if $logger.is_enabled(level) {
            $logger.log_at(level, format!($($arg)+), $metadata, $crate::__call_site!())
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $crate::log!($logger, $level, meta = $crate::LogMetadata::new(); $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use masked_logger::prelude::*;
/// # let logger = Logger::builder().min_level(LogLevel::Debug).sink(MemorySink::new("m")).build().unwrap();
/// use masked_logger::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use masked_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new("m")).build().unwrap();
/// use masked_logger::error;
/// error!(logger, "Error message");
/// error!(logger, "Code: {}", 500);
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, LogMetadata, Logger};
    use crate::sinks::{MemoryHandle, MemorySink};
    use std::time::Duration;

    fn logger() -> (Logger, MemoryHandle) {
        let sink = MemorySink::new("m");
        let handle = sink.handle();
        let logger = Logger::builder()
            .min_level(LogLevel::Debug)
            .sink(sink)
            .build()
            .unwrap();
        (logger, handle)
    }

    #[test]
    fn test_function_name() {
        assert_eq!(function_name!(), "test_function_name");
        let from_closure = || function_name!();
        assert_eq!(from_closure(), "test_function_name");
    }

    #[test]
    fn test_log_macro_records_call_site() {
        let (mut logger, handle) = logger();
        let line = line!() + 1;
        log!(logger, LogLevel::Info, "Formatted: {}", 42);
        logger.shutdown(Duration::from_secs(5));

        let record = &handle.records()[0];
        assert_eq!(record.message(), "Formatted: 42");
        assert_eq!(record.location().module, module_path!());
        assert_eq!(record.location().function, "test_log_macro_records_call_site");
        assert_eq!(record.location().line, line);
    }

    #[test]
    fn test_level_macros() {
        let (mut logger, handle) = logger();
        debug!(logger, "Debug message");
        info!(logger, "Items: {}", 100);
        warning!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        critical!(logger, "Critical failure: {}", "system");
        logger.shutdown(Duration::from_secs(5));

        let levels: Vec<LogLevel> = handle.records().iter().map(|r| r.level()).collect();
        assert_eq!(levels, LogLevel::ALL.to_vec());
    }

    #[test]
    fn test_macro_with_metadata() {
        let (mut logger, handle) = logger();
        info!(logger, meta = LogMetadata::new().user_id("123").correlation_id("abc123"); "Application started");
        logger.shutdown(Duration::from_secs(5));

        let record = &handle.records()[0];
        assert_eq!(record.user_id(), "123");
        assert_eq!(record.correlation_id(), "abc123");
    }

    #[test]
    fn test_filtered_macro_skips_formatting() {
        let (mut logger, handle) = logger();
        logger.set_min_level(LogLevel::Error);
        info!(logger, "never {}", 1);
        logger.shutdown(Duration::from_secs(5));
        assert!(handle.is_empty());
    }
}
