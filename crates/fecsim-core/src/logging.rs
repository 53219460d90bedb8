//! Structured Logging — tracing subscriber setup for simulation runs
//!
//! Simulation progress (point start/finish, reductions, cancellations) is
//! emitted through `tracing` events with structured fields. This module
//! installs the global subscriber; `RUST_LOG` overrides the configured
//! level when set.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One event per line.
    #[default]
    Compact,
    /// Machine-readable JSON events.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include thread names (useful when reading per-worker traces).
    pub thread_names: bool,
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let result = match config.format {
        LogFormat::Compact => tracing::subscriber::set_global_default(
            fmt()
                .compact()
                .with_env_filter(filter)
                .with_thread_names(config.thread_names)
                .finish(),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            fmt()
                .json()
                .with_env_filter(filter)
                .with_thread_names(config.thread_names)
                .finish(),
        ),
    };
    let _ = result;
}
