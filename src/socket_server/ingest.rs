//! Socket ingestion server
//!
//! Listens for producers, reassembles frames per connection, decodes each
//! payload and persists it as a PNG in the graphics directory. Persisted
//! files reach the display through the directory watcher like any other
//! file; nothing here touches the display list.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::codec;
use crate::error::{IntakeError, Result};
use crate::fs_utils;

use super::connection::{spawn_accept_loop, spawn_reader, SocketEvent};
use super::state::{Connection, ConnectionId, ServerState};

/// An image written to disk from a socket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedImage {
    pub connection: ConnectionId,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A frame that was extracted but not persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFrame {
    pub connection: ConnectionId,
    pub bytes: usize,
    pub error: String,
}

/// What one batch of incoming bytes produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub persisted: Vec<PersistedImage>,
    pub dropped: Vec<DroppedFrame>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.persisted.is_empty() && self.dropped.is_empty()
    }
}

/// TCP listener plus per-connection frame buffers
pub struct SocketIngestServer {
    bind_host: IpAddr,
    directory: PathBuf,
    state: ServerState,
    accept_task: Option<JoinHandle<()>>,
    events: UnboundedSender<SocketEvent>,
    generation: u64,
    next_id: u64,
}

impl SocketIngestServer {
    /// Create a stopped server that persists into `directory`
    pub fn new(directory: PathBuf, events: UnboundedSender<SocketEvent>) -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            directory,
            state: ServerState::default(),
            accept_task: None,
            events,
            generation: 0,
            next_id: 0,
        }
    }

    /// Bind to a specific interface instead of all interfaces
    pub fn with_bind_host(mut self, host: IpAddr) -> Self {
        self.set_bind_host(host);
        self
    }

    pub fn set_bind_host(&mut self, host: IpAddr) {
        self.bind_host = host;
    }

    pub fn set_directory(&mut self, directory: PathBuf) {
        self.directory = directory;
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_listening(&self) -> bool {
        self.state.listening
    }

    /// Bound port while listening
    pub fn port(&self) -> Option<u16> {
        self.state.port
    }

    pub fn connection_count(&self) -> usize {
        self.state.connection_count()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.state.buffered_bytes()
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Start listening on `port` (0 picks an ephemeral port)
    ///
    /// A running listener is stopped first. On failure the server stays
    /// stopped and the error is returned.
    pub async fn listen(&mut self, port: u16) -> Result<u16> {
        if self.state.listening {
            self.stop();
        }

        let listener = TcpListener::bind((self.bind_host, port))
            .await
            .map_err(|source| IntakeError::Bind { port, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| IntakeError::Bind { port, source })?
            .port();

        self.generation += 1;
        self.accept_task = Some(spawn_accept_loop(
            listener,
            self.generation,
            self.events.clone(),
        ));
        self.state.listening = true;
        self.state.port = Some(bound);

        tracing::info!("Socket server listening on {}:{}", self.bind_host, bound);
        Ok(bound)
    }

    /// Close the listener and every connection; returns how many were open
    pub fn stop(&mut self) -> usize {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        let dropped = self.state.drop_connections();
        if self.state.listening {
            tracing::info!(
                "Socket server stopped ({} connections closed)",
                dropped
            );
        }
        self.state.listening = false;
        self.state.port = None;
        dropped
    }

    /// Dispatch one forwarded socket event
    pub fn handle(&mut self, event: SocketEvent) -> IngestReport {
        match event {
            SocketEvent::Accepted {
                generation,
                stream,
                peer,
            } => {
                self.on_accepted(generation, stream, peer);
                IngestReport::default()
            }
            SocketEvent::Data { id, bytes } => self.on_data(id, &bytes),
            SocketEvent::Closed { id, error } => {
                self.on_closed(id, error.as_deref());
                IngestReport::default()
            }
        }
    }

    /// Register an accepted stream with an empty buffer
    pub fn on_accepted(
        &mut self,
        generation: u64,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Option<ConnectionId> {
        // Accepted by a listener that has since been stopped
        if !self.state.listening || generation != self.generation {
            tracing::debug!("Dropping stale connection from {}", peer);
            return None;
        }

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        let reader = spawn_reader(id, stream, self.events.clone());
        self.state
            .connections
            .insert(id, Connection::new(id, peer, reader));
        tracing::info!("New connection {} from {}", id, peer);
        Some(id)
    }

    /// Append bytes to a connection buffer and process every complete frame
    pub fn on_data(&mut self, id: ConnectionId, bytes: &[u8]) -> IngestReport {
        let Some(connection) = self.state.connections.get_mut(&id) else {
            tracing::debug!("Data for unknown connection {} ignored", id);
            return IngestReport::default();
        };

        connection.buffer.extend(bytes);
        let mut frames = Vec::new();
        while let Some(frame) = connection.buffer.next_frame() {
            frames.push(frame);
        }
        connection.frames += frames.len() as u64;

        let mut report = IngestReport::default();
        for payload in frames {
            match self.persist(&payload) {
                Ok((path, (width, height))) => {
                    tracing::info!(
                        "Image from {} saved to {} ({}x{})",
                        id,
                        path.display(),
                        width,
                        height
                    );
                    report.persisted.push(PersistedImage {
                        connection: id,
                        path,
                        width,
                        height,
                    });
                }
                Err(e) => {
                    tracing::warn!("Dropping {}-byte frame from {}: {}", payload.len(), id, e);
                    report.dropped.push(DroppedFrame {
                        connection: id,
                        bytes: payload.len(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Forget a connection and its buffer
    pub fn on_closed(&mut self, id: ConnectionId, error: Option<&str>) {
        let Some(connection) = self.state.connections.remove(&id) else {
            return;
        };
        match error {
            Some(e) => tracing::warn!("Connection {} failed: {}", id, e),
            None => tracing::info!("Connection {} closed", id),
        }
        if !connection.buffer.is_empty() {
            tracing::debug!(
                "Discarding {} buffered bytes from {}",
                connection.buffer.len(),
                id
            );
        }
        connection.abort();
    }

    /// Decode a payload and write it as PNG; nothing is written on failure
    fn persist(&self, payload: &[u8]) -> Result<(PathBuf, (u32, u32))> {
        let bitmap = codec::decode(payload)?;
        let png = codec::encode_png(&bitmap).map_err(|e| IntakeError::io(&self.directory, e))?;
        let path = unique_image_path(&self.directory, epoch_millis());
        fs_utils::write_atomic(&path, &png).map_err(|e| IntakeError::io(&path, e))?;
        Ok((path, bitmap.dimensions()))
    }
}

impl Drop for SocketIngestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// `socket_image_<millis>.png`, or the first free `_<n>` variant
pub fn unique_image_path(directory: &Path, millis: u128) -> PathBuf {
    let base = directory.join(format!("socket_image_{}.png", millis));
    if !base.exists() {
        return base;
    }
    (1u64..)
        .map(|n| directory.join(format!("socket_image_{}_{}.png", millis, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}
