//! Plotsink: image intake engine for plot producers
//!
//! A producer process (typically a plotting session) hands over rendered
//! images in one of two ways:
//!
//! - **file**: it writes image files into a graphics directory
//! - **socket**: it streams length-prefixed images over TCP, which are
//!   decoded and written into the same directory
//!
//! Either way the directory is the single source of truth. The engine
//! watches it, rebuilds an ordered display list on every change, and scales
//! each image to the current viewport.
//!
//! # Example
//!
//! ```no_run
//! use plotsink::{Engine, EventEmitter, PlotsinkConfig};
//!
//! # async fn demo() -> plotsink::Result<()> {
//! let config = PlotsinkConfig::default();
//! let directory = config.intake.directory.clone();
//! let mut engine = Engine::new(config, EventEmitter::Stdout)?;
//! engine.set_directory(&directory)?;
//! engine.start_server(8080).await?;
//! engine.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod producer;
pub mod scaling;
pub mod server;
pub mod socket_server;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use codec::{decode, decode_file, Bitmap, SniffedFormat};
pub use config::{PlotsinkConfig, Transport};
pub use error::{DecodeError, IntakeError, Result};
pub use producer::{producer_env, send_images};
pub use scaling::ScalingPolicy;
pub use server::{
    Engine, EngineMessage, EventEmitter, ImageAction, ImageRecord, ImageStore, RefreshReport,
    WatchEvent, WatchListener,
};
pub use socket_server::{encode_frame, FrameBuffer, SocketIngestServer};
