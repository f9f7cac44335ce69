//! Directory watcher for the graphics directory
//!
//! Uses the `notify` crate to watch the graphics directory and every image
//! currently on display, and forwards debounced change notifications to the
//! engine loop.
//!
//! # Features
//!
//! - Non-recursive watch on the directory (new and removed files)
//! - One watch per displayed file (in-place rewrites)
//! - Debounced events (100ms window so one write yields one refresh)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────┐
//! │   notify    │────>│  debouncer  │────>│  WatchTargets │────>│ engine  │
//! │   watcher   │     │  (100ms)    │     │  (classify)   │     │  loop   │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────┘
//! ```
//!
//! The watch set is kept equal to the directory plus the displayed paths;
//! a path whose registration fails is reported back so the caller can drop
//! it from the display list too.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use parking_lot::RwLock;

use crate::config::WatcherConfig;
use crate::error::{IntakeError, Result};
use crate::fs_utils;

/// A classified change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Something inside (or the directory itself) changed
    DirectoryChanged(PathBuf),
    /// A displayed file changed in place
    FileChanged(PathBuf),
}

impl WatchEvent {
    /// Invoke the matching listener callback
    pub fn dispatch<L: WatchListener + ?Sized>(&self, listener: &mut L) {
        match self {
            WatchEvent::DirectoryChanged(path) => listener.on_directory_changed(path),
            WatchEvent::FileChanged(path) => listener.on_file_changed(path),
        }
    }
}

/// Receiver of change notifications, called from the engine loop
pub trait WatchListener {
    fn on_directory_changed(&mut self, path: &Path);
    fn on_file_changed(&mut self, path: &Path);
}

/// Registration of individual watch paths
pub trait WatchBackend: Send {
    fn watch(&mut self, path: &Path) -> Result<()>;
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}

/// Current watch targets, shared with the notify callback for classification
#[derive(Debug, Default, Clone)]
pub struct WatchTargets {
    directory: Option<PathBuf>,
    files: BTreeSet<PathBuf>,
}

impl WatchTargets {
    /// Map a raw notification path to an event, if it concerns us
    pub fn classify(&self, path: &Path) -> Option<WatchEvent> {
        if self.files.contains(path) {
            return Some(WatchEvent::FileChanged(path.to_path_buf()));
        }

        let directory = self.directory.as_ref()?;
        if path == directory {
            return Some(WatchEvent::DirectoryChanged(directory.clone()));
        }
        // Temp files and other non-image entries never change the list
        if path.parent() == Some(directory.as_path()) && fs_utils::is_image_path(path) {
            return Some(WatchEvent::DirectoryChanged(directory.clone()));
        }
        None
    }

    /// Collapse a debounced batch: any directory-level change wins, since
    /// it triggers a full rescan anyway
    pub fn classify_batch<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a Path>,
    ) -> Vec<WatchEvent> {
        let mut file_events = Vec::new();
        for path in paths {
            match self.classify(path) {
                Some(event @ WatchEvent::DirectoryChanged(_)) => return vec![event],
                Some(event) => {
                    if !file_events.contains(&event) {
                        file_events.push(event);
                    }
                }
                None => tracing::trace!("[WATCHER] Ignored: {:?}", path),
            }
        }
        file_events
    }
}

/// `notify` backend with a debounce window
pub struct NotifyBackend {
    debouncer: Debouncer<RecommendedWatcher>,
}

impl NotifyBackend {
    /// Start the debouncer; classified events are handed to `sink`
    pub fn new<F>(
        debounce: Duration,
        targets: Arc<RwLock<WatchTargets>>,
        sink: F,
    ) -> Result<Self>
    where
        F: Fn(WatchEvent) + Send + 'static,
    {
        let debouncer = new_debouncer(
            debounce,
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    tracing::debug!("[WATCHER] Received {} debounced events", events.len());
                    let paths = events
                        .iter()
                        .filter(|e| {
                            matches!(
                                e.kind,
                                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                            )
                        })
                        .map(|e| e.path.as_path());
                    let classified = targets.read().classify_batch(paths);
                    for event in classified {
                        tracing::debug!("[WATCHER] Dispatching {:?}", event);
                        sink(event);
                    }
                }
                Err(e) => {
                    tracing::error!("[WATCHER] Watcher error: {}", e);
                }
            },
        )
        .map_err(IntakeError::watch)?;

        Ok(Self { debouncer })
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, path: &Path) -> Result<()> {
        self.debouncer
            .watcher()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(IntakeError::watch)
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.debouncer
            .watcher()
            .unwatch(path)
            .map_err(IntakeError::watch)
    }
}

/// Watches one directory plus an explicit set of files
pub struct DirectoryWatcher<B: WatchBackend = NotifyBackend> {
    backend: B,
    targets: Arc<RwLock<WatchTargets>>,
}

impl DirectoryWatcher<NotifyBackend> {
    /// Create a notify-backed watcher that forwards events to `sink`
    pub fn new<F>(config: &WatcherConfig, sink: F) -> Result<Self>
    where
        F: Fn(WatchEvent) + Send + 'static,
    {
        let targets = Arc::new(RwLock::new(WatchTargets::default()));
        let backend = NotifyBackend::new(config.debounce(), Arc::clone(&targets), sink)?;
        Ok(Self { backend, targets })
    }
}

impl<B: WatchBackend> DirectoryWatcher<B> {
    /// Wrap an arbitrary backend
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            targets: Arc::new(RwLock::new(WatchTargets::default())),
        }
    }

    /// Shared targets, for backends that classify their own events
    pub fn targets(&self) -> Arc<RwLock<WatchTargets>> {
        Arc::clone(&self.targets)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn directory(&self) -> Option<PathBuf> {
        self.targets.read().directory.clone()
    }

    pub fn watched_files(&self) -> BTreeSet<PathBuf> {
        self.targets.read().files.clone()
    }

    /// The directory plus every watched file
    pub fn watch_set(&self) -> BTreeSet<PathBuf> {
        let targets = self.targets.read();
        let mut set = targets.files.clone();
        if let Some(directory) = &targets.directory {
            set.insert(directory.clone());
        }
        set
    }

    /// Drop every watch and start watching `directory`
    pub fn watch_directory(&mut self, directory: &Path) -> Result<()> {
        self.unwatch_all();
        self.backend.watch(directory)?;
        self.targets.write().directory = Some(directory.to_path_buf());
        tracing::info!("[WATCHER] Watching {}", directory.display());
        Ok(())
    }

    /// Make the file watches equal to `paths`
    ///
    /// Returns the paths that could not be registered; they are not part of
    /// the watch set afterwards.
    pub fn sync_files(&mut self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let wanted: BTreeSet<PathBuf> = paths.iter().cloned().collect();
        let current = self.watched_files();

        for stale in current.difference(&wanted) {
            if let Err(e) = self.backend.unwatch(stale) {
                // Deleted files lose their watch on their own
                tracing::debug!("[WATCHER] Unwatch {} failed: {}", stale.display(), e);
            }
        }

        let mut failed = Vec::new();
        let mut registered: BTreeSet<PathBuf> = current.intersection(&wanted).cloned().collect();
        for path in wanted.difference(&current) {
            match self.backend.watch(path) {
                Ok(()) => {
                    registered.insert(path.clone());
                }
                Err(e) => {
                    tracing::warn!("[WATCHER] Could not watch {}: {}", path.display(), e);
                    failed.push(path.clone());
                }
            }
        }

        self.targets.write().files = registered;
        failed
    }

    /// Remove every watch, directory included
    pub fn unwatch_all(&mut self) {
        let previous = std::mem::take(&mut *self.targets.write());
        for path in previous.files.iter().chain(previous.directory.iter()) {
            if let Err(e) = self.backend.unwatch(path) {
                tracing::debug!("[WATCHER] Unwatch {} failed: {}", path.display(), e);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Backend that records registrations and rejects chosen paths
    #[derive(Default, Clone)]
    struct RecordingBackend {
        active: Arc<Mutex<BTreeSet<PathBuf>>>,
        reject: BTreeSet<PathBuf>,
    }

    impl WatchBackend for RecordingBackend {
        fn watch(&mut self, path: &Path) -> Result<()> {
            if self.reject.contains(path) {
                return Err(IntakeError::watch("No such file or directory"));
            }
            self.active.lock().insert(path.to_path_buf());
            Ok(())
        }

        fn unwatch(&mut self, path: &Path) -> Result<()> {
            self.active.lock().remove(path);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingListener {
        directory: Vec<PathBuf>,
        files: Vec<PathBuf>,
    }

    impl WatchListener for CountingListener {
        fn on_directory_changed(&mut self, path: &Path) {
            self.directory.push(path.to_path_buf());
        }

        fn on_file_changed(&mut self, path: &Path) {
            self.files.push(path.to_path_buf());
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/g").join(n)).collect()
    }

    #[test]
    fn test_watch_set_equals_directory_plus_files() {
        let backend = RecordingBackend::default();
        let active = Arc::clone(&backend.active);
        let mut watcher = DirectoryWatcher::with_backend(backend);

        watcher.watch_directory(Path::new("/g")).unwrap();
        assert!(watcher.sync_files(&paths(&["a.png", "b.png"])).is_empty());

        let expected: BTreeSet<PathBuf> = ["/g", "/g/a.png", "/g/b.png"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(watcher.watch_set(), expected);
        assert_eq!(*active.lock(), expected);

        watcher.sync_files(&paths(&["b.png", "c.png"]));
        let expected: BTreeSet<PathBuf> = ["/g", "/g/b.png", "/g/c.png"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(watcher.watch_set(), expected);
        assert_eq!(*active.lock(), expected);
    }

    #[test]
    fn test_failed_registration_is_excluded() {
        let mut backend = RecordingBackend::default();
        backend.reject.insert(PathBuf::from("/g/vanished.png"));
        let mut watcher = DirectoryWatcher::with_backend(backend);

        watcher.watch_directory(Path::new("/g")).unwrap();
        let failed = watcher.sync_files(&paths(&["a.png", "vanished.png"]));

        assert_eq!(failed, paths(&["vanished.png"]));
        let expected: BTreeSet<PathBuf> = paths(&["a.png"]).into_iter().collect();
        assert_eq!(watcher.watched_files(), expected);
    }

    #[test]
    fn test_watch_directory_replaces_previous_watches() {
        let backend = RecordingBackend::default();
        let active = Arc::clone(&backend.active);
        let mut watcher = DirectoryWatcher::with_backend(backend);

        watcher.watch_directory(Path::new("/g")).unwrap();
        watcher.sync_files(&paths(&["a.png"]));
        watcher.watch_directory(Path::new("/other")).unwrap();

        assert_eq!(watcher.directory(), Some(PathBuf::from("/other")));
        assert!(watcher.watched_files().is_empty());
        let expected: BTreeSet<PathBuf> = [PathBuf::from("/other")].into_iter().collect();
        assert_eq!(*active.lock(), expected);
    }

    #[test]
    fn test_classify_events() {
        let mut targets = WatchTargets::default();
        targets.directory = Some(PathBuf::from("/g"));
        targets.files.insert(PathBuf::from("/g/a.png"));

        assert_eq!(
            targets.classify(Path::new("/g/a.png")),
            Some(WatchEvent::FileChanged(PathBuf::from("/g/a.png")))
        );
        assert_eq!(
            targets.classify(Path::new("/g/new.JPG")),
            Some(WatchEvent::DirectoryChanged(PathBuf::from("/g")))
        );
        assert_eq!(
            targets.classify(Path::new("/g")),
            Some(WatchEvent::DirectoryChanged(PathBuf::from("/g")))
        );
        assert_eq!(targets.classify(Path::new("/g/.new.png.part")), None);
        assert_eq!(targets.classify(Path::new("/elsewhere/x.png")), None);
    }

    #[test]
    fn test_batch_with_directory_change_collapses() {
        let mut targets = WatchTargets::default();
        targets.directory = Some(PathBuf::from("/g"));
        targets.files.insert(PathBuf::from("/g/a.png"));

        let batch = [Path::new("/g/a.png"), Path::new("/g/b.png"), Path::new("/g/a.png")];
        assert_eq!(
            targets.classify_batch(batch),
            vec![WatchEvent::DirectoryChanged(PathBuf::from("/g"))]
        );

        let batch = [Path::new("/g/a.png"), Path::new("/g/a.png")];
        assert_eq!(
            targets.classify_batch(batch),
            vec![WatchEvent::FileChanged(PathBuf::from("/g/a.png"))]
        );
    }

    #[test]
    fn test_dispatch_calls_listener() {
        let mut listener = CountingListener::default();
        WatchEvent::DirectoryChanged(PathBuf::from("/g")).dispatch(&mut listener);
        WatchEvent::FileChanged(PathBuf::from("/g/a.png")).dispatch(&mut listener);
        assert_eq!(listener.directory, vec![PathBuf::from("/g")]);
        assert_eq!(listener.files, vec![PathBuf::from("/g/a.png")]);
    }

    #[test]
    fn test_notify_backend_starts_and_watches_tempdir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = WatcherConfig::default();
        let mut watcher = DirectoryWatcher::new(&config, |_| {}).unwrap();
        watcher.watch_directory(dir.path()).unwrap();
        assert_eq!(watcher.directory(), Some(dir.path().to_path_buf()));
    }
}
