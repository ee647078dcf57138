// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Logging setup and structured dispatch events.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application via [`init_logging`]. Events use these targets:
//!
//! - `dengww::ops` - operator dispatch (`op`, `device`, `numel` fields)
//! - `dengww::registry` - registration and lookups
//! - `dengww::memory` - output allocation accounting
//!
//! `RUST_LOG` always takes precedence over the configured default level, e.g.
//! `RUST_LOG=dengww::ops=trace`.

use crate::error::CoreError;
use std::str::FromStr;
use std::sync::Once;

/// Configuration for logging initialization.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub default_level: LogLevel,
    /// Include timestamps in log output.
    pub with_timestamps: bool,
    /// Include target (module path) in log output.
    pub with_target: bool,
    /// Include source file and line numbers.
    pub with_file_line: bool,
    /// Use ANSI colors (disable for file output).
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            with_timestamps: true,
            with_target: true,
            with_file_line: false,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Create a new logging configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default log level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    /// Enable or disable timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.with_timestamps = enable;
        self
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }

    /// Debug level with file/line info, for working on kernels.
    #[must_use]
    pub fn development() -> Self {
        Self {
            default_level: LogLevel::Debug,
            with_timestamps: true,
            with_target: true,
            with_file_line: true,
            with_ansi: true,
        }
    }

    /// Info level without colors, for log ingestion.
    #[must_use]
    pub fn production() -> Self {
        Self {
            default_level: LogLevel::Info,
            with_timestamps: true,
            with_target: false,
            with_file_line: false,
            with_ansi: false,
        }
    }

    /// Warnings only, no decorations.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            default_level: LogLevel::Warn,
            with_timestamps: false,
            with_target: false,
            with_file_line: false,
            with_ansi: false,
        }
    }
}

/// Log level enumeration, mapping to tracing levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and above.
    Warn,
    /// Informational messages and above.
    #[default]
    Info,
    /// Debug messages and above.
    Debug,
    /// All messages including trace.
    Trace,
}

impl LogLevel {
    fn as_filter_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(CoreError::invalid_config(format!(
                "invalid log level: {other} (use trace, debug, info, warn, error)"
            ))),
        }
    }
}

static INIT_LOGGING: Once = Once::new();

/// Install the global tracing subscriber. Later calls are no-ops.
///
/// ## Example
///
/// ```rust
/// use dengww_ops::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::testing());
/// ```
pub fn init_logging(config: &LogConfig) {
    INIT_LOGGING.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| config.default_level.as_filter_str().to_string());

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .with_file(config.with_file_line)
            .with_line_number(config.with_file_line);

        // try_init: a host application may already own the global subscriber.
        let installed = if config.with_timestamps {
            builder.try_init()
        } else {
            builder.without_time().try_init()
        };
        if installed.is_err() {
            tracing::debug!("global tracing subscriber already set, keeping it");
        }
    });
}

/// Emit the dispatch event for one operator call.
pub fn log_dispatch(op: &str, device: &str, numel: usize) {
    tracing::debug!(target: "dengww::ops", op, device, numel, "dispatch");
}

/// Emit an allocation accounting event.
#[allow(clippy::cast_precision_loss)]
pub fn log_allocation(op: &str, bytes: usize, allocated_bytes: usize) {
    let allocated_mb = allocated_bytes as f64 / (1024.0 * 1024.0);
    tracing::trace!(
        target: "dengww::memory",
        op,
        bytes,
        allocated_mb = format!("{allocated_mb:.2}"),
        "output allocated"
    );
}
