// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Logging
//!
//! Logging macros for the IPC core. Records go to the `log` facade when
//! the `logging` feature is enabled; the embedding kernel (or a test
//! harness) installs the actual logger. Without the feature every macro
//! compiles to nothing.
//!
//! # Usage
//!
//! ```rust,ignore
//! log_debug!("channel {} created", id);
//! log_trace_if!(LOCAL_TRACE, "enqueue on endpoint {}", ep);
//! ```

/// Log levels
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Trace-level logging (very verbose)
    Trace = 0,

    /// Debug-level logging (verbose)
    Debug = 1,

    /// Informational logging
    Info = 2,

    /// Warning-level logging
    Warning = 3,

    /// Error-level logging
    Error = 4,
}

impl LogLevel {
    #[cfg(feature = "logging")]
    fn to_log(self) -> log::Level {
        match self {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Log target used for every record emitted by this crate
pub const LOG_TARGET: &str = "rustux::ipc";

/// Emit a log record
#[cfg(feature = "logging")]
#[inline]
pub fn log_print(level: LogLevel, args: core::fmt::Arguments) {
    log::log!(target: LOG_TARGET, level.to_log(), "{}", args);
}

/// Emit a log record (logging disabled)
#[cfg(not(feature = "logging"))]
#[inline(always)]
pub fn log_print(_level: LogLevel, _args: core::fmt::Arguments) {}

/// Log a trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print($crate::kernel::debug::LogLevel::Trace, format_args!($($arg)*))
    };
}

/// Log a trace message if condition is true
#[macro_export]
macro_rules! log_trace_if {
    ($cond:expr, $($arg:tt)*) => {
        if $cond {
            $crate::log_trace!($($arg)*);
        }
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print($crate::kernel::debug::LogLevel::Debug, format_args!($($arg)*))
    };
}

/// Log an info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print($crate::kernel::debug::LogLevel::Info, format_args!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print($crate::kernel::debug::LogLevel::Warning, format_args!($($arg)*))
    };
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_print($crate::kernel::debug::LogLevel::Error, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[cfg(feature = "logging")]
    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::Warning.to_log(), log::Level::Warn);
        assert_eq!(LogLevel::Error.to_log(), log::Level::Error);
    }

    #[test]
    fn test_macros_expand() {
        // No logger is installed; the calls must still be accepted.
        log_debug!("value {}", 1);
        log_trace_if!(false, "never {}", 2);
    }
}
