//! Error types and exit codes for plotsink

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Why a payload could not be turned into a bitmap
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("corrupt {format} data: {message}")]
    CorruptData { format: String, message: String },
}

/// Main error type for plotsink operations
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Graphics directory does not exist: {path}")]
    MissingDirectory { path: PathBuf },

    #[error("File watcher error: {message}")]
    Watch { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl IntakeError {
    /// Attach a path to an `std::io::Error`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a notify error
    pub fn watch(err: impl std::fmt::Display) -> Self {
        Self::Watch {
            message: err.to_string(),
        }
    }

    /// Convert error to an exit code for the CLI:
    /// - 1: I/O error / missing directory
    /// - 2: Bind failure
    /// - 3: Decode failure
    /// - 4: Watcher failure
    /// - 5: Configuration error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io { .. } => ExitCode::from(1),
            Self::MissingDirectory { .. } => ExitCode::from(1),
            Self::Bind { .. } => ExitCode::from(2),
            Self::Decode(_) => ExitCode::from(3),
            Self::Watch { .. } => ExitCode::from(4),
            Self::Config { .. } => ExitCode::from(5),
        }
    }
}

/// Result type alias for plotsink operations
pub type Result<T> = std::result::Result<T, IntakeError>;
