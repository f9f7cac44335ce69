//! Plotsink Socket Intake
//!
//! Receives images from a producer over TCP and drops them into the
//! graphics directory, where the directory watcher picks them up.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SOCKET INTAKE (engine loop)                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  accept task ──► SocketEvent::Accepted ──┐                              │
//! │  reader task ──► SocketEvent::Data ──────┼──► SocketIngestServer        │
//! │  reader task ──► SocketEvent::Closed ────┘      │                       │
//! │                                                 ├─ FrameBuffer per conn │
//! │                                                 ├─ codec::decode        │
//! │                                                 └─ write_atomic (PNG)   │
//! │                                                        │                │
//! │                                    graphics directory ◄┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol
//!
//! Pipelined frames, no delimiter, no acknowledgment:
//!
//! ```text
//! [u32 big-endian length N][N bytes of PNG/JPEG/BMP/GIF/SVG]
//! ```

pub mod connection;
pub mod ingest;
pub mod protocol;
pub mod state;

pub use connection::SocketEvent;
pub use ingest::{DroppedFrame, IngestReport, PersistedImage, SocketIngestServer};
pub use protocol::{encode_frame, FrameBuffer, FrameState, HEADER_LEN};
pub use state::{ConnectionId, ServerState};
