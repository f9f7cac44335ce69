//! Connection tasks
//!
//! The accept loop and per-connection readers only move bytes: they forward
//! what they see to the engine loop as [`SocketEvent`]s and never touch
//! buffers or the filesystem.

use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::state::ConnectionId;

/// Read size per socket wakeup
const READ_CHUNK: usize = 64 * 1024;

/// Raw socket activity forwarded to the engine loop
#[derive(Debug)]
pub enum SocketEvent {
    /// A producer connected to the listener started in `generation`
    Accepted {
        generation: u64,
        stream: TcpStream,
        peer: SocketAddr,
    },
    /// Bytes read from a connection, in arrival order
    Data { id: ConnectionId, bytes: Vec<u8> },
    /// EOF or read error
    Closed {
        id: ConnectionId,
        error: Option<String>,
    },
}

/// Accept connections until the task is aborted or the engine goes away
pub fn spawn_accept_loop(
    listener: TcpListener,
    generation: u64,
    events: UnboundedSender<SocketEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!("Accepted connection from {}", peer);
                    let event = SocketEvent::Accepted {
                        generation,
                        stream,
                        peer,
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }
    })
}

/// Read from `stream` until EOF, error, or abort
pub fn spawn_reader(
    id: ConnectionId,
    mut stream: TcpStream,
    events: UnboundedSender<SocketEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) => {
                    let _ = events.send(SocketEvent::Closed { id, error: None });
                    break;
                }
                Ok(n) => {
                    let event = SocketEvent::Data {
                        id,
                        bytes: chunk[..n].to_vec(),
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = events.send(SocketEvent::Closed {
                        id,
                        error: Some(e.to_string()),
                    });
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_reader_forwards_bytes_then_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let accept = spawn_accept_loop(listener, 1, tx.clone());
        let mut client = TcpStream::connect(addr).await.unwrap();

        let stream = match rx.recv().await.unwrap() {
            SocketEvent::Accepted { generation, stream, .. } => {
                assert_eq!(generation, 1);
                stream
            }
            other => panic!("expected Accepted, got {:?}", other),
        };
        let _reader = spawn_reader(ConnectionId(1), stream, tx);

        client.write_all(b"hello").await.unwrap();
        client.shutdown().await.unwrap();
        drop(client);

        let mut received = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                SocketEvent::Data { id, bytes } => {
                    assert_eq!(id, ConnectionId(1));
                    received.extend(bytes);
                }
                SocketEvent::Closed { id, error } => {
                    assert_eq!(id, ConnectionId(1));
                    assert!(error.is_none());
                    break;
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(received, b"hello");
        accept.abort();
    }
}
