//! The engine: one owned instance wiring watcher, store and socket intake
//!
//! Everything runs on a single cooperative loop. The notify backend and the
//! socket tasks only forward raw events into channels; [`Engine::handle`]
//! processes each one to completion before the next is taken.
//!
//! The launch layer drives the engine through three entry points:
//! [`Engine::set_directory`], [`Engine::start_server`] and
//! [`Engine::stop_server`].

use std::collections::BTreeSet;
use std::future::Future;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config::PlotsinkConfig;
use crate::error::{IntakeError, Result};
use crate::fs_utils;
use crate::socket_server::{IngestReport, SocketEvent, SocketIngestServer};

use super::events::{
    DisplayUpdatedEvent, EventEmitter, FrameDroppedEvent, ImageReceivedEvent, ServerStatusEvent,
};
use super::store::{ImageAction, ImageRecord, ImageStore, RefreshReport, RescaleReport};
use super::watcher::{DirectoryWatcher, WatchEvent, WatchListener};

/// Anything the loop can be woken by
#[derive(Debug)]
pub enum EngineMessage {
    Watch(WatchEvent),
    Socket(SocketEvent),
}

pub struct Engine {
    config: PlotsinkConfig,
    directory: Option<PathBuf>,
    store: ImageStore,
    watcher: DirectoryWatcher,
    server: SocketIngestServer,
    emitter: EventEmitter,
    watch_rx: UnboundedReceiver<WatchEvent>,
    socket_rx: UnboundedReceiver<SocketEvent>,
    shut_down: bool,
}

impl Engine {
    /// Build an engine; nothing is watched until [`set_directory`](Self::set_directory)
    pub fn new(config: PlotsinkConfig, emitter: EventEmitter) -> Result<Self> {
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();
        let (socket_tx, socket_rx) = mpsc::unbounded_channel();

        let watcher = DirectoryWatcher::new(&config.watcher, move |event| {
            // Loop has shut down
            let _ = watch_tx.send(event);
        })?;

        let directory = config.intake.directory.clone();
        let store = ImageStore::new(
            directory.clone(),
            config.display.scaling,
            config.available_width(),
        );
        let server = SocketIngestServer::new(directory, socket_tx);

        Ok(Self {
            config,
            directory: None,
            store,
            watcher,
            server,
            emitter,
            watch_rx,
            socket_rx,
            shut_down: false,
        })
    }

    pub fn config(&self) -> &PlotsinkConfig {
        &self.config
    }

    /// Directory currently watched, if any
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Ordered display list
    pub fn display_list(&self) -> &[ImageRecord] {
        self.store.records()
    }

    pub fn display_paths(&self) -> Vec<PathBuf> {
        self.store.paths()
    }

    /// Directory plus every watched file
    pub fn watch_set(&self) -> BTreeSet<PathBuf> {
        self.watcher.watch_set()
    }

    pub fn server(&self) -> &SocketIngestServer {
        &self.server
    }

    /// Interface the socket server binds to on the next start
    pub fn set_bind_host(&mut self, host: IpAddr) {
        self.server.set_bind_host(host);
    }

    /// Switch to `path`: unwatch everything, create it if needed, watch it
    /// and rebuild the display list
    ///
    /// Setting the current directory again does nothing.
    pub fn set_directory(&mut self, path: &Path) -> Result<()> {
        if let Some(current) = &self.directory {
            if fs_utils::same_directory(current, path) {
                tracing::debug!("Directory unchanged: {}", path.display());
                return Ok(());
            }
        }

        self.watcher.unwatch_all();
        self.directory = None;

        std::fs::create_dir_all(path).map_err(|e| IntakeError::io(path, e))?;
        let directory = fs_utils::canonical_or_self(path);

        self.watcher.watch_directory(&directory)?;
        self.store.set_directory(directory.clone());
        self.server.set_directory(directory.clone());
        self.config.intake.directory = directory.clone();
        self.directory = Some(directory);

        self.reconcile("directory_set")?;
        Ok(())
    }

    /// Start the socket server; returns the bound port
    ///
    /// A bind failure leaves the server stopped and is reported, never fatal.
    pub async fn start_server(&mut self, port: u16) -> Result<u16> {
        match self.server.listen(port).await {
            Ok(bound) => {
                self.config.socket.port = bound;
                self.emitter.emit(&ServerStatusEvent::listening(bound));
                Ok(bound)
            }
            Err(e) => {
                tracing::error!("Failed to start socket server: {}", e);
                self.emitter
                    .emit(&ServerStatusEvent::bind_failed(port, e.to_string()));
                Err(e)
            }
        }
    }

    /// Stop the socket server; returns how many connections were dropped
    pub fn stop_server(&mut self) -> usize {
        let port = self.server.port();
        let was_listening = self.server.is_listening();
        let dropped = self.server.stop();
        if was_listening {
            self.emitter.emit(&ServerStatusEvent::stopped(port, dropped));
        }
        dropped
    }

    /// Full rescan of the directory
    pub fn refresh(&mut self) -> Result<RefreshReport> {
        self.reconcile("refresh")
    }

    /// Apply a new viewport width; every bitmap is recomputed from its file
    pub fn resize(&mut self, viewport_width: u32) -> RescaleReport {
        self.config.display.viewport_width = viewport_width;
        let available = self.config.available_width();
        let report = self.store.rescale(available);
        tracing::debug!(
            "Rescaled {} images for available width {}",
            report.rescaled,
            available
        );
        self.emit_display("resize", 0, false);
        report
    }

    /// Run a per-image action; the display list follows via the watcher
    pub fn perform(&mut self, action: &ImageAction) -> Result<()> {
        tracing::debug!("Performing {:?}", action);
        action.perform()
    }

    pub fn delete(&mut self, path: &Path) -> Result<()> {
        ImageStore::delete(path)
    }

    pub fn save(&mut self, path: &Path, destination: &Path) -> Result<u64> {
        ImageStore::save(path, destination)
    }

    /// Wait for the next watcher or socket event
    pub async fn next_message(&mut self) -> Option<EngineMessage> {
        tokio::select! {
            Some(event) = self.watch_rx.recv() => Some(EngineMessage::Watch(event)),
            Some(event) = self.socket_rx.recv() => Some(EngineMessage::Socket(event)),
            else => None,
        }
    }

    /// Process one event to completion
    pub fn handle(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Watch(event) => event.dispatch(self),
            EngineMessage::Socket(event) => {
                let report = self.server.handle(event);
                self.emit_ingest(&report);
            }
        }
    }

    /// Drive the loop until `shutdown` resolves, then stop the server
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                message = self.next_message() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
            }
        }
        self.stop_server();
        Ok(())
    }

    /// Stop everything and clean the temporary directory; idempotent
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.stop_server();
        self.watcher.unwatch_all();
        if let Some(directory) = self.directory.take() {
            cleanup_if_temporary(&directory, &fs_utils::default_graphics_dir());
        }
    }

    fn reconcile(&mut self, reason: &str) -> Result<RefreshReport> {
        let report = match self.store.refresh() {
            Ok(report) => report,
            Err(e) => {
                // The store is already empty; its file watches go with it
                self.watcher.sync_files(&[]);
                self.emit_display(reason, 0, false);
                return Err(e);
            }
        };

        for failed in self.watcher.sync_files(&self.store.paths()) {
            self.store.forget(&failed);
        }

        tracing::debug!(
            "Reconciled ({}): {} images, {} skipped",
            reason,
            self.store.records().len(),
            report.skipped.len()
        );
        self.emit_display(reason, report.skipped.len(), report.missing_directory);
        Ok(report)
    }

    fn emit_display(&self, reason: &str, skipped: usize, missing: bool) {
        self.emitter.emit(&DisplayUpdatedEvent::new(
            reason,
            self.store.entries(),
            skipped,
            missing,
        ));
    }

    fn emit_ingest(&self, report: &IngestReport) {
        for image in &report.persisted {
            self.emitter.emit(&ImageReceivedEvent::new(
                image.connection.0,
                image.path.clone(),
                (image.width, image.height),
            ));
        }
        for frame in &report.dropped {
            self.emitter.emit(&FrameDroppedEvent::new(
                frame.connection.0,
                frame.bytes,
                frame.error.clone(),
            ));
        }
    }
}

impl WatchListener for Engine {
    fn on_directory_changed(&mut self, path: &Path) {
        tracing::debug!("Directory changed: {}", path.display());
        if let Err(e) = self.reconcile("directory_changed") {
            tracing::error!("Refresh after directory change failed: {}", e);
        }
    }

    fn on_file_changed(&mut self, path: &Path) {
        tracing::debug!("File changed: {}", path.display());
        if let Err(e) = self.reconcile("file_changed") {
            tracing::error!("Refresh after file change failed: {}", e);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Remove image files from `directory` if it is the temporary graphics
/// directory, then the directory itself if nothing else is left
///
/// Returns the number of files removed.
pub fn cleanup_if_temporary(directory: &Path, temporary: &Path) -> usize {
    if !fs_utils::same_directory(directory, temporary) {
        return 0;
    }

    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !fs_utils::is_image_path(&path) || !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    // Fails when other files remain, which is fine
    if std::fs::remove_dir(directory).is_ok() {
        tracing::info!("Removed temporary graphics directory {}", directory.display());
    }
    removed
}
