//! Display engine
//!
//! Keeps an ordered list of decoded, display-sized images in sync with a
//! graphics directory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              Engine                                  │
//! │                                                                      │
//! │  ┌──────────────────┐  WatchEvent   ┌──────────────────────────┐    │
//! │  │ DirectoryWatcher │──────────────>│                          │    │
//! │  └──────────────────┘               │   single event loop      │    │
//! │  ┌──────────────────┐  SocketEvent  │   (handle to completion) │    │
//! │  │ SocketIngest     │──────────────>│                          │    │
//! │  └──────────────────┘               └────────────┬─────────────┘    │
//! │                                                  │ refresh()        │
//! │                                     ┌────────────▼─────────────┐    │
//! │                                     │ ImageStore (display list)│    │
//! │                                     └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Ownership
//!
//! The engine owns all state. The notify callback and socket tasks hold
//! only channel senders, so no locks guard the display list or buffers.
//!
//! # Modules
//!
//! - `engine` - event loop and the collaborator entry points
//! - `store` - scan, decode, order and act on images
//! - `watcher` - directory and per-file change notifications
//! - `events` - JSON-lines notifications for front ends

pub mod engine;
pub mod events;
pub mod store;
pub mod watcher;

pub use engine::{cleanup_if_temporary, Engine, EngineMessage};
pub use events::{
    DisplayEntry, DisplayUpdatedEvent, EngineEvent, EventEmitter, FrameDroppedEvent,
    ImageReceivedEvent, ServerStatusEvent,
};
pub use store::{ImageAction, ImageRecord, ImageStore, RefreshReport, RescaleReport};
pub use watcher::{DirectoryWatcher, WatchBackend, WatchEvent, WatchListener};
