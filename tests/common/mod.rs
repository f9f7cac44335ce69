//! Common test utilities and fixtures for plotsink integration tests
//!
//! This module provides:
//! - `GraphicsDir` builder for populating a temporary graphics directory
//! - `drive_until` for running the engine loop until a condition holds
//! - Image fixtures encoded in memory

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod graphics_dir;

pub use graphics_dir::{png_bytes, GraphicsDir};

use std::time::Duration;

use plotsink::{Engine, EventEmitter, PlotsinkConfig};

/// How long a test waits for watcher or socket activity
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Config with a short debounce window to keep tests fast
pub fn test_config() -> PlotsinkConfig {
    let mut config = PlotsinkConfig::default();
    config.watcher.debounce_ms = 20;
    config
}

pub fn test_engine() -> Engine {
    Engine::new(test_config(), EventEmitter::Disabled).expect("Failed to create engine")
}

/// Run the engine loop until `done` holds or the timeout expires
///
/// Returns whether the condition was met.
pub async fn drive_until<F>(engine: &mut Engine, mut done: F) -> bool
where
    F: FnMut(&Engine) -> bool,
{
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while !done(engine) {
        match tokio::time::timeout_at(deadline, engine.next_message()).await {
            Ok(Some(message)) => engine.handle(message),
            Ok(None) | Err(_) => return done(engine),
        }
    }
    true
}

/// Keep handling events for `window`, whatever they are
pub async fn drain_for(engine: &mut Engine, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    while let Ok(Some(message)) = tokio::time::timeout_at(deadline, engine.next_message()).await {
        engine.handle(message);
    }
}
