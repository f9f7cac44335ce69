//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Transport;

/// Live image viewer backend for plot producers
#[derive(Parser, Debug)]
#[command(name = "plotsink")]
#[command(
    about = "Collects plot images from a directory or a TCP socket and keeps a live display list"
)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to <config dir>/plotsink/config.toml)
    #[arg(long, value_name = "PATH", global = true, env = "PLOTSINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================
// Main Commands Enum
// ============================================

/// Available subcommands for plotsink
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a graphics directory and report display updates
    #[command(visible_alias = "w")]
    Watch(WatchArgs),

    /// Receive images over TCP and display them
    Serve(ServeArgs),

    /// Scan a directory once and print the display list
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Send image files to a running server
    Send(SendArgs),

    /// Print the environment a producer should be launched with
    Env(EnvArgs),
}

// ============================================
// Subcommand Arguments
// ============================================

/// Arguments for the watch command
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Graphics directory (defaults to <temp>/graphics)
    #[arg(long, value_name = "PATH", env = "JULIA_GRAPHICS_DIR")]
    pub dir: Option<PathBuf>,

    /// Viewport width used for display sizing
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "JULIA_SOCKET_PORT")]
    pub port: Option<u16>,

    /// Interface to bind (defaults to all interfaces)
    #[arg(long)]
    pub host: Option<String>,

    /// Directory received images are written to
    #[arg(long, value_name = "PATH", env = "JULIA_GRAPHICS_DIR")]
    pub dir: Option<PathBuf>,

    /// Viewport width used for display sizing
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory to scan
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Viewport width used for display sizing
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,
}

/// Arguments for the send command
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server host
    #[arg(long, env = "JULIA_SOCKET_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, env = "JULIA_SOCKET_PORT")]
    pub port: Option<u16>,

    /// Image files to send, one frame each
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for the env command
#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Transport the producer should use
    #[arg(long, value_enum)]
    pub transport: Option<Transport>,
}

// ============================================
// Output Format
// ============================================

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    #[value(alias = "pretty")]
    Text,
    /// JSON (events are JSON lines in long-running commands)
    Json,
}
