//! Engine events for push notifications to a display front end
//!
//! The engine emits JSON events, one object per line (JSON Lines), whenever
//! something a front end would render has changed:
//! ```json
//! {"type":"display_updated","reason":"directory_changed","images":[...],...}
//! ```
//!
//! # Event Types
//!
//! - `display_updated` - the ordered display list was rebuilt or rescaled
//! - `server_status` - socket server started, stopped or failed to bind
//! - `image_received` - a socket frame was decoded and persisted
//! - `frame_dropped` - a socket frame could not be decoded

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Where emitted events go
#[derive(Clone, Default)]
pub enum EventEmitter {
    /// Events are discarded
    #[default]
    Disabled,
    /// One JSON line per event on stdout
    Stdout,
    /// One human-readable line per event on stdout
    Text,
    /// Collected in memory (tests, embedding front ends)
    Memory(Arc<Mutex<Vec<String>>>),
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventEmitter::Disabled => write!(f, "EventEmitter::Disabled"),
            EventEmitter::Stdout => write!(f, "EventEmitter::Stdout"),
            EventEmitter::Text => write!(f, "EventEmitter::Text"),
            EventEmitter::Memory(lines) => {
                write!(f, "EventEmitter::Memory({})", lines.lock().len())
            }
        }
    }
}

impl EventEmitter {
    /// Create an in-memory emitter and return the shared line buffer
    pub fn memory() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (EventEmitter::Memory(Arc::clone(&lines)), lines)
    }

    /// Emit an event as a JSON line
    pub fn emit<E: EngineEvent>(&self, event: &E) {
        if matches!(self, EventEmitter::Disabled) {
            return;
        }

        let wrapper = EventWrapper {
            event_type: E::event_type(),
            payload: event,
        };

        let json = match serde_json::to_string(&wrapper) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize {} event: {}", E::event_type(), e);
                return;
            }
        };

        match self {
            EventEmitter::Disabled => {}
            EventEmitter::Stdout => print_line(&json),
            EventEmitter::Text => print_line(&render_text(&json)),
            EventEmitter::Memory(lines) => lines.lock().push(json),
        }
    }
}

fn print_line(line: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Reader may have gone away
    let _ = writeln!(handle, "{}", line);
    let _ = handle.flush();
}

/// `type key=value ...`, with arrays shown as their length
fn render_text(json: &str) -> String {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(json) else {
        return json.to_string();
    };
    let mut line = map
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("event")
        .to_string();
    for (key, value) in &map {
        if key == "type" || key == "timestamp" {
            continue;
        }
        let rendered = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items.len().to_string(),
            other => other.to_string(),
        };
        line.push_str(&format!(" {}={}", key, rendered));
    }
    line
}

/// Wrapper for events with type field
#[derive(Serialize)]
struct EventWrapper<'a, P: Serialize> {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(flatten)]
    payload: &'a P,
}

/// Trait for engine events
pub trait EngineEvent: Serialize {
    fn event_type() -> &'static str;
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ============================================================================
// Event Types
// ============================================================================

/// One entry of the display list
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DisplayEntry {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Modification time (ISO 8601)
    pub modified: String,
}

/// Emitted after every reconciliation or rescale
#[derive(Debug, Clone, Serialize)]
pub struct DisplayUpdatedEvent {
    /// What triggered the update (directory_changed, file_changed, refresh, resize)
    pub reason: String,
    /// Images in display order (newest first)
    pub images: Vec<DisplayEntry>,
    /// Files with an image extension that failed to decode
    pub skipped: usize,
    /// Whether the graphics directory was missing
    pub missing_directory: bool,
    pub timestamp: String,
}

impl EngineEvent for DisplayUpdatedEvent {
    fn event_type() -> &'static str {
        "display_updated"
    }
}

impl DisplayUpdatedEvent {
    pub fn new(reason: &str, images: Vec<DisplayEntry>, skipped: usize, missing: bool) -> Self {
        Self {
            reason: reason.to_string(),
            images,
            skipped,
            missing_directory: missing,
            timestamp: now(),
        }
    }
}

/// Emitted when the socket server changes state
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatusEvent {
    /// listening, stopped, bind_failed
    pub status: String,
    pub port: Option<u16>,
    pub connections: usize,
    pub message: Option<String>,
    pub timestamp: String,
}

impl EngineEvent for ServerStatusEvent {
    fn event_type() -> &'static str {
        "server_status"
    }
}

impl ServerStatusEvent {
    pub fn listening(port: u16) -> Self {
        Self {
            status: "listening".to_string(),
            port: Some(port),
            connections: 0,
            message: None,
            timestamp: now(),
        }
    }

    pub fn stopped(port: Option<u16>, dropped_connections: usize) -> Self {
        Self {
            status: "stopped".to_string(),
            port,
            connections: dropped_connections,
            message: None,
            timestamp: now(),
        }
    }

    pub fn bind_failed(port: u16, message: String) -> Self {
        Self {
            status: "bind_failed".to_string(),
            port: Some(port),
            connections: 0,
            message: Some(message),
            timestamp: now(),
        }
    }
}

/// Emitted when a socket frame was decoded and written to disk
#[derive(Debug, Clone, Serialize)]
pub struct ImageReceivedEvent {
    pub connection: u64,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub timestamp: String,
}

impl EngineEvent for ImageReceivedEvent {
    fn event_type() -> &'static str {
        "image_received"
    }
}

impl ImageReceivedEvent {
    pub fn new(connection: u64, path: PathBuf, (width, height): (u32, u32)) -> Self {
        Self {
            connection,
            path,
            width,
            height,
            timestamp: now(),
        }
    }
}

/// Emitted when a socket frame is discarded
#[derive(Debug, Clone, Serialize)]
pub struct FrameDroppedEvent {
    pub connection: u64,
    pub bytes: usize,
    pub error: String,
    pub timestamp: String,
}

impl EngineEvent for FrameDroppedEvent {
    fn event_type() -> &'static str {
        "frame_dropped"
    }
}

impl FrameDroppedEvent {
    pub fn new(connection: u64, bytes: usize, error: String) -> Self {
        Self {
            connection,
            bytes,
            error,
            timestamp: now(),
        }
    }
}
