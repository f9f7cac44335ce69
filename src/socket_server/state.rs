//! Socket server bookkeeping
//!
//! Owned by the engine loop; reader tasks never touch it.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use tokio::task::JoinHandle;

use super::protocol::FrameBuffer;

/// Per-process unique connection id (never reused across restarts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// One accepted producer connection
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    /// Never shared with another connection
    pub buffer: FrameBuffer,
    /// Frames extracted so far
    pub frames: u64,
    reader: JoinHandle<()>,
}

impl Connection {
    pub fn new(id: ConnectionId, peer: SocketAddr, reader: JoinHandle<()>) -> Self {
        Self {
            id,
            peer,
            buffer: FrameBuffer::new(),
            frames: 0,
            reader,
        }
    }

    /// Forcibly disconnect: the reader task owns the socket
    pub fn abort(&self) {
        self.reader.abort();
    }
}

/// Listening flag, bound port and active connections
#[derive(Debug, Default)]
pub struct ServerState {
    pub listening: bool,
    pub port: Option<u16>,
    pub connections: HashMap<ConnectionId, Connection>,
}

impl ServerState {
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Bytes held across every connection buffer
    pub fn buffered_bytes(&self) -> usize {
        self.connections.values().map(|c| c.buffer.len()).sum()
    }

    /// Abort every reader and forget every connection; returns how many
    pub fn drop_connections(&mut self) -> usize {
        let count = self.connections.len();
        for (_, connection) in self.connections.drain() {
            connection.abort();
        }
        count
    }
}
