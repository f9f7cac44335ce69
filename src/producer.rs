//! Producer side of the intake
//!
//! The launch layer tells the producer which transport to use through
//! environment variables, and [`send_images`] is a minimal socket producer
//! used by the `send` command and the integration tests.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::{PlotsinkConfig, Transport};
use crate::error::{IntakeError, Result};
use crate::socket_server::encode_frame;

pub const ENV_METHOD: &str = "JULIA_GRAPHICS_METHOD";
pub const ENV_DIR: &str = "JULIA_GRAPHICS_DIR";
pub const ENV_HOST: &str = "JULIA_SOCKET_HOST";
pub const ENV_PORT: &str = "JULIA_SOCKET_PORT";

/// Variables to inject into the producer process
pub fn producer_env(config: &PlotsinkConfig) -> Vec<(String, String)> {
    let mut env = vec![(
        ENV_METHOD.to_string(),
        config.intake.transport.as_str().to_string(),
    )];
    match config.intake.transport {
        Transport::File => {
            env.push((
                ENV_DIR.to_string(),
                config.intake.directory.display().to_string(),
            ));
        }
        Transport::Socket => {
            env.push((ENV_HOST.to_string(), config.socket.host.clone()));
            env.push((ENV_PORT.to_string(), config.socket.port.to_string()));
        }
    }
    env
}

/// Connect to `addr` and write one frame per file, in order
///
/// Returns the number of payload bytes sent.
pub async fn send_images(addr: &str, paths: &[PathBuf]) -> Result<usize> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| IntakeError::io(addr, e))?;

    let mut sent = 0;
    for path in paths {
        let frame = read_frame(path)?;
        stream
            .write_all(&frame)
            .await
            .map_err(|e| IntakeError::io(addr, e))?;
        sent += frame.len() - crate::socket_server::HEADER_LEN;
        tracing::debug!("Sent {} ({} bytes)", path.display(), frame.len());
    }

    stream.flush().await.map_err(|e| IntakeError::io(addr, e))?;
    stream
        .shutdown()
        .await
        .map_err(|e| IntakeError::io(addr, e))?;
    Ok(sent)
}

fn read_frame(path: &Path) -> Result<Vec<u8>> {
    let payload = std::fs::read(path).map_err(|e| IntakeError::io(path, e))?;
    encode_frame(&payload).map_err(|e| IntakeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_file_transport_env() {
        let mut config = PlotsinkConfig::default();
        config.intake.directory = PathBuf::from("/data/plots");

        let env = producer_env(&config);
        assert_eq!(lookup(&env, ENV_METHOD), Some("file"));
        assert_eq!(lookup(&env, ENV_DIR), Some("/data/plots"));
        assert_eq!(lookup(&env, ENV_PORT), None);
    }

    #[test]
    fn test_socket_transport_env() {
        let mut config = PlotsinkConfig::default();
        config.intake.transport = Transport::Socket;
        config.socket.port = 9123;

        let env = producer_env(&config);
        assert_eq!(lookup(&env, ENV_METHOD), Some("socket"));
        assert_eq!(lookup(&env, ENV_HOST), Some("localhost"));
        assert_eq!(lookup(&env, ENV_PORT), Some("9123"));
        assert_eq!(lookup(&env, ENV_DIR), None);
    }

    #[tokio::test]
    async fn test_send_to_closed_port_is_io_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = send_images(&addr, &[]).await.unwrap_err();
        assert!(matches!(err, IntakeError::Io { .. }));
    }
}
