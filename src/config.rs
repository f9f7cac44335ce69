//! Plotsink configuration management.
//!
//! Handles the configuration file at:
//! - Linux: ~/.config/plotsink/config.toml
//! - macOS: ~/Library/Application Support/plotsink/config.toml
//! - Windows: %APPDATA%\plotsink\config.toml
//!
//! A missing file yields defaults. CLI flags override individual values
//! after loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, Result};
use crate::fs_utils;
use crate::scaling::ScalingPolicy;

/// How the producer hands images to us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Producer writes files into the graphics directory
    #[default]
    File,
    /// Producer streams length-prefixed frames over TCP
    Socket,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::File => "file",
            Transport::Socket => "socket",
        }
    }
}

/// Plotsink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlotsinkConfig {
    #[serde(default)]
    pub intake: IntakeConfig,

    #[serde(default)]
    pub socket: SocketConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Intake settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Transport used by the producer
    #[serde(default)]
    pub transport: Transport,
    /// Graphics directory (defaults to `<temp>/graphics`)
    #[serde(default = "fs_utils::default_graphics_dir")]
    pub directory: PathBuf,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            directory: fs_utils::default_graphics_dir(),
        }
    }
}

/// Socket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Host the producer connects to
    #[serde(default = "default_socket_host")]
    pub host: String,
    /// Port the server listens on
    #[serde(default = "default_socket_port")]
    pub port: u16,
}

fn default_socket_host() -> String {
    "localhost".to_string()
}

fn default_socket_port() -> u16 {
    8080
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: default_socket_host(),
            port: default_socket_port(),
        }
    }
}

/// Display sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Current viewport width (0 = not laid out yet)
    #[serde(default)]
    pub viewport_width: u32,
    /// Space reserved for frame and scroll bar
    #[serde(default = "default_margin")]
    pub margin: u32,
    #[serde(default)]
    pub scaling: ScalingPolicy,
}

fn default_margin() -> u32 {
    100
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            viewport_width: 0,
            margin: default_margin(),
            scaling: ScalingPolicy::default(),
        }
    }
}

/// Directory watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    100
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PlotsinkConfig {
    /// Default location of the config file, if a config dir exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("plotsink").join("config.toml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| IntakeError::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| IntakeError::Config {
            message: format!("Failed to parse config: {}", e),
        })
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| IntakeError::io(parent, e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| IntakeError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs_utils::write_atomic(path, content.as_bytes()).map_err(|e| IntakeError::io(path, e))
    }

    /// Width handed to the scaling policy for the configured viewport
    pub fn available_width(&self) -> u32 {
        self.display
            .viewport_width
            .saturating_sub(self.display.margin)
    }
}
