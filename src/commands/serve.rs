//! Serve command handler
//!
//! Socket transport: listens for length-prefixed image frames, persists each
//! decoded image into the graphics directory and follows that directory like
//! `watch` does.
//!
//! On Ctrl-C the server is stopped, every open connection is dropped, and a
//! temporary graphics directory is cleaned up when the engine goes away.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};

use crate::cli::ServeArgs;
use crate::config::Transport;
use crate::error::IntakeError;
use crate::server::Engine;

use super::{build_runtime, shutdown_signal, CommandContext};

/// Run the socket server until Ctrl-C
pub fn run_serve(args: &ServeArgs, ctx: &CommandContext) -> crate::Result<String> {
    let mut config = ctx.config.clone();
    config.intake.transport = Transport::Socket;
    if let Some(dir) = &args.dir {
        config.intake.directory = dir.clone();
    }
    if let Some(port) = args.port {
        config.socket.port = port;
    }
    if let Some(width) = args.width {
        config.display.viewport_width = width;
    }
    let bind_host = args.host.as_deref().map(parse_bind_host).transpose()?;

    let directory = config.intake.directory.clone();
    let port = config.socket.port;

    let runtime = build_runtime()?;
    runtime.block_on(async {
        let mut engine = Engine::new(config, ctx.emitter())?;
        if let Some(host) = bind_host {
            engine.set_bind_host(host);
        }
        engine.set_directory(&directory)?;

        serve_until(&mut engine, port, shutdown_signal()).await
    })?;

    Ok(String::new())
}

/// Accept frames and follow the directory until `shutdown` resolves
///
/// A port that cannot be bound only disables socket intake; the directory is
/// still followed.
async fn serve_until<F>(engine: &mut Engine, port: u16, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()>,
{
    let directory = engine
        .directory()
        .map(|d| d.display().to_string())
        .unwrap_or_default();
    match engine.start_server(port).await {
        Ok(bound) => tracing::info!("Receiving images on port {} into {}", bound, directory),
        Err(e) => tracing::warn!("Socket intake disabled, following {} only: {}", directory, e),
    }

    engine.run(shutdown).await
}

/// Interface to bind; `localhost` means the IPv4 loopback
fn parse_bind_host(host: &str) -> crate::Result<IpAddr> {
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    host.parse().map_err(|_| IntakeError::Config {
        message: format!("Invalid bind address: {}", host),
    })
}
