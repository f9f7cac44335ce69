//! Command modules for the plotsink CLI
//!
//! Each command module implements a single top-level command:
//! - `watch` - file transport: follow a graphics directory
//! - `serve` - socket transport: receive frames and follow the directory
//! - `list` - one-shot scan of a directory
//! - `send` - minimal socket producer
//! - `env` - producer environment variables
//!
//! All command handlers take their respective `Args` struct from `cli.rs`
//! and a shared `CommandContext` for output format, verbosity and config.

pub mod env;
pub mod list;
pub mod send;
pub mod serve;
pub mod watch;

pub use env::run_env;
pub use list::run_list;
pub use send::run_send;
pub use serve::run_serve;
pub use watch::run_watch;

use crate::cli::OutputFormat;
use crate::config::PlotsinkConfig;
use crate::error::{IntakeError, Result};
use crate::server::EventEmitter;

/// Shared context passed to all command handlers
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Output format (text or json)
    pub format: OutputFormat,
    /// Show verbose output
    pub verbose: bool,
    /// Loaded configuration, before per-command overrides
    pub config: PlotsinkConfig,
}

impl CommandContext {
    pub fn new(format: OutputFormat, verbose: bool, config: PlotsinkConfig) -> Self {
        Self {
            format,
            verbose,
            config,
        }
    }

    /// Event sink matching the output format
    pub fn emitter(&self) -> EventEmitter {
        match self.format {
            OutputFormat::Json => EventEmitter::Stdout,
            OutputFormat::Text => EventEmitter::Text,
        }
    }
}

/// Current-thread runtime: the engine is a single cooperative loop
pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| IntakeError::Config {
            message: format!("Failed to create tokio runtime: {}", e),
        })
}

/// Resolves on Ctrl-C
pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Serialize a value for `--format json`
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| IntakeError::Config {
        message: format!("JSON serialization failed: {}", e),
    })
}
