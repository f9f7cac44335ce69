//! Image store and reconciler
//!
//! Owns the authoritative, ordered display list. The filesystem is the only
//! source of truth: every change notification rebuilds the list from a fresh
//! directory scan, and user actions (delete, save) touch files only. A
//! deleted image disappears from the list when the watcher reports the
//! deletion, not before.
//!
//! Ordering is modification time descending; ties fall back to path
//! ascending so that two scans of an unchanged directory are identical.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::codec::{self, Bitmap};
use crate::error::{IntakeError, Result};
use crate::fs_utils;
use crate::scaling::ScalingPolicy;

use super::events::DisplayEntry;

/// One displayed image
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Identity of the record
    pub path: PathBuf,
    pub modified: SystemTime,
    /// Decoded and scaled for the current viewport
    pub bitmap: Bitmap,
}

/// A per-image user action, bound to its target when the record offers it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAction {
    Save { path: PathBuf, destination: PathBuf },
    Delete { path: PathBuf },
}

impl ImageAction {
    pub fn target(&self) -> &Path {
        match self {
            ImageAction::Save { path, .. } | ImageAction::Delete { path } => path,
        }
    }

    /// Run the action against the filesystem
    pub fn perform(&self) -> Result<()> {
        match self {
            ImageAction::Save { path, destination } => {
                ImageStore::save(path, destination).map(|_| ())
            }
            ImageAction::Delete { path } => ImageStore::delete(path),
        }
    }
}

impl ImageRecord {
    pub fn save_action(&self, destination: PathBuf) -> ImageAction {
        ImageAction::Save {
            path: self.path.clone(),
            destination,
        }
    }

    pub fn delete_action(&self) -> ImageAction {
        ImageAction::Delete {
            path: self.path.clone(),
        }
    }

    pub fn display_entry(&self) -> DisplayEntry {
        let modified: chrono::DateTime<chrono::Utc> = self.modified.into();
        DisplayEntry {
            path: self.path.clone(),
            width: self.bitmap.width(),
            height: self.bitmap.height(),
            modified: modified.to_rfc3339(),
        }
    }
}

/// A candidate found by a directory scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Outcome of a full reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub loaded: usize,
    /// Image-extension files that failed to decode, with the reason
    pub skipped: Vec<(PathBuf, String)>,
    pub missing_directory: bool,
}

/// Outcome of a viewport rescale
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescaleReport {
    pub rescaled: usize,
    /// Records whose source could not be decoded again (bitmap kept)
    pub stale: Vec<PathBuf>,
}

/// Scan `directory` for recognized image files, newest first
///
/// Returns `MissingDirectory` if the directory does not exist.
pub fn scan_directory(directory: &Path) -> Result<Vec<ScannedFile>> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IntakeError::MissingDirectory {
                path: directory.to_path_buf(),
            });
        }
        Err(e) => return Err(IntakeError::io(directory, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {:?}: {}", directory, e);
                continue;
            }
        };
        let path = entry.path();
        if !fs_utils::is_image_path(&path) {
            continue;
        }
        // Entries can vanish between read_dir and stat
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push(ScannedFile { path, modified });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}

/// Authoritative ordered list of displayed images
#[derive(Debug)]
pub struct ImageStore {
    directory: PathBuf,
    records: Vec<ImageRecord>,
    policy: ScalingPolicy,
    available_width: u32,
}

impl ImageStore {
    pub fn new(directory: PathBuf, policy: ScalingPolicy, available_width: u32) -> Self {
        Self {
            directory,
            records: Vec::new(),
            policy,
            available_width,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Point the store at another directory; the list is emptied until the
    /// next refresh
    pub fn set_directory(&mut self, directory: PathBuf) {
        self.directory = directory;
        self.records.clear();
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, path: &Path) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    /// Paths in display order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.records.iter().map(|r| r.path.clone()).collect()
    }

    pub fn entries(&self) -> Vec<DisplayEntry> {
        self.records.iter().map(ImageRecord::display_entry).collect()
    }

    pub fn available_width(&self) -> u32 {
        self.available_width
    }

    pub fn policy(&self) -> ScalingPolicy {
        self.policy
    }

    /// Full reconciliation: clear, rescan, re-add every decodable image
    ///
    /// A missing directory yields an empty list, not an error. Files that
    /// fail to decode are skipped without aborting the scan.
    pub fn refresh(&mut self) -> Result<RefreshReport> {
        self.records.clear();
        let mut report = RefreshReport::default();

        let files = match scan_directory(&self.directory) {
            Ok(files) => files,
            Err(IntakeError::MissingDirectory { path }) => {
                tracing::warn!("Graphics directory does not exist: {}", path.display());
                report.missing_directory = true;
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            "Found {} image files in {}",
            files.len(),
            self.directory.display()
        );

        for file in files {
            match self.add(&file.path, file.modified) {
                Ok(true) => report.loaded += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to load image {}: {}", file.path.display(), e);
                    report.skipped.push((file.path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Ingest one file at the end of the list: decode, scale, record
    ///
    /// Returns `Ok(false)` if the path is already present.
    pub fn add(&mut self, path: &Path, modified: SystemTime) -> Result<bool> {
        if self.get(path).is_some() {
            return Ok(false);
        }
        let source = codec::decode_file(path)?;
        let bitmap = self.policy.scale(&source, self.available_width);
        tracing::debug!(
            "Loaded {} ({}x{} -> {}x{})",
            path.display(),
            source.width(),
            source.height(),
            bitmap.width(),
            bitmap.height()
        );
        self.records.push(ImageRecord {
            path: path.to_path_buf(),
            modified,
            bitmap,
        });
        Ok(true)
    }

    /// Drop a record without touching its file
    pub fn forget(&mut self, path: &Path) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.path != path);
        self.records.len() != before
    }

    /// Recompute every displayed bitmap from its source file
    pub fn rescale(&mut self, available_width: u32) -> RescaleReport {
        self.available_width = available_width;
        let mut report = RescaleReport::default();

        for record in &mut self.records {
            match codec::decode_file(&record.path) {
                Ok(source) => {
                    record.bitmap = self.policy.scale(&source, available_width);
                    report.rescaled += 1;
                }
                Err(e) => {
                    tracing::debug!(
                        "Keeping previous bitmap for {}: {}",
                        record.path.display(),
                        e
                    );
                    report.stale.push(record.path.clone());
                }
            }
        }

        report
    }

    /// Remove the file behind an image
    ///
    /// The display list is not touched; the watcher observes the deletion.
    pub fn delete(path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|e| IntakeError::io(path, e))?;
        tracing::debug!("Image deleted: {}", path.display());
        Ok(())
    }

    /// Byte-level copy of an image to `destination`
    pub fn save(path: &Path, destination: &Path) -> Result<u64> {
        let copied =
            std::fs::copy(path, destination).map_err(|e| IntakeError::io(destination, e))?;
        tracing::debug!("Image saved to: {}", destination.display());
        Ok(copied)
    }

    /// `<stem>_saved.<ext>`, offered as the default save-as name
    pub fn suggested_save_name(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_string_lossy();
        match path.extension() {
            Some(ext) => Some(format!("{}_saved.{}", stem, ext.to_string_lossy())),
            None => Some(format!("{}_saved", stem)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn png(width: u32, height: u32) -> Vec<u8> {
        codec::encode_png(&Bitmap::new(width, height)).unwrap()
    }

    fn write_with_mtime(path: &Path, bytes: &[u8], secs: u64) {
        std::fs::write(path, bytes).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn store(dir: &Path) -> ImageStore {
        ImageStore::new(dir.to_path_buf(), ScalingPolicy::default(), 0)
    }

    #[test]
    fn test_refresh_orders_newest_first() {
        let dir = TempDir::new().unwrap();
        write_with_mtime(&dir.path().join("a.png"), &png(4, 4), 1_000);
        write_with_mtime(&dir.path().join("b.png"), &png(4, 4), 1_001);

        let mut store = store(dir.path());
        let report = store.refresh().unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(
            store.paths(),
            vec![dir.path().join("b.png"), dir.path().join("a.png")]
        );
    }

    #[test]
    fn test_refresh_twice_is_identical() {
        let dir = TempDir::new().unwrap();
        for (i, name) in ["x.png", "y.png", "z.png", "w.png"].iter().enumerate() {
            // Two pairs share an mtime to exercise the tie-break
            write_with_mtime(&dir.path().join(name), &png(3, 3), 500 + (i as u64 / 2));
        }

        let mut store = store(dir.path());
        store.refresh().unwrap();
        let first = store.paths();
        store.refresh().unwrap();
        assert_eq!(first, store.paths());
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_invalid_files_skipped_without_aborting() {
        let dir = TempDir::new().unwrap();
        write_with_mtime(&dir.path().join("good1.png"), &png(2, 2), 10);
        write_with_mtime(&dir.path().join("good2.jpg"), &png(2, 2), 11);
        write_with_mtime(&dir.path().join("bad1.png"), b"not an image", 12);
        write_with_mtime(&dir.path().join("bad2.gif"), b"GIF89a truncated", 13);
        write_with_mtime(&dir.path().join("ignored.txt"), b"text", 14);

        let mut store = store(dir.path());
        let report = store.refresh().unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn test_missing_directory_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir.path().join("nope"));
        let report = store.refresh().unwrap();
        assert!(report.missing_directory);
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_add_same_path_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        write_with_mtime(&path, &png(2, 2), 1);

        let mut store = store(dir.path());
        assert!(store.add(&path, SystemTime::UNIX_EPOCH).unwrap());
        assert!(!store.add(&path, SystemTime::UNIX_EPOCH).unwrap());
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_delete_touches_file_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        write_with_mtime(&path, &png(2, 2), 1);

        let mut store = store(dir.path());
        store.refresh().unwrap();
        let delete = store.records()[0].delete_action();
        assert_eq!(delete.target(), path.as_path());
        delete.perform().unwrap();

        assert!(!path.exists());
        assert_eq!(store.records().len(), 1, "list changes only on refresh");
        store.refresh().unwrap();
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_delete_missing_file_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let err = ImageStore::delete(&dir.path().join("gone.png")).unwrap_err();
        assert!(matches!(err, IntakeError::Io { .. }));
    }

    #[test]
    fn test_save_copies_bytes_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        let bytes = png(5, 5);
        write_with_mtime(&path, &bytes, 1);

        let mut store = store(dir.path());
        store.refresh().unwrap();
        let dest = dir.path().join("copy.png");
        assert_eq!(ImageStore::save(&path, &dest).unwrap(), bytes.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), bytes);

        let second = dir.path().join("copy2.png");
        store.records()[0].save_action(second.clone()).perform().unwrap();
        assert_eq!(std::fs::read(&second).unwrap(), bytes);
    }

    #[test]
    fn test_save_to_unwritable_destination_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        write_with_mtime(&path, &png(1, 1), 1);
        let err = ImageStore::save(&path, &dir.path().join("no/such/dir/a.png")).unwrap_err();
        assert!(matches!(err, IntakeError::Io { .. }));
    }

    #[test]
    fn test_rescale_recomputes_from_source() {
        let dir = TempDir::new().unwrap();
        write_with_mtime(&dir.path().join("wide.png"), &png(1000, 200), 1);

        let mut store = store(dir.path());
        store.refresh().unwrap();
        assert_eq!(store.records()[0].bitmap.dimensions(), (400, 80));

        let report = store.rescale(800);
        assert_eq!(report.rescaled, 1);
        assert_eq!(store.records()[0].bitmap.dimensions(), (800, 160));

        store.rescale(200);
        assert_eq!(store.records()[0].bitmap.dimensions(), (200, 40));
    }

    #[test]
    fn test_rescale_keeps_bitmap_when_source_gone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        write_with_mtime(&path, &png(10, 10), 1);

        let mut store = store(dir.path());
        store.refresh().unwrap();
        std::fs::remove_file(&path).unwrap();

        let report = store.rescale(500);
        assert_eq!(report.stale, vec![path]);
        assert_eq!(store.records()[0].bitmap.dimensions(), (10, 10));
    }

    #[test]
    fn test_suggested_save_name() {
        assert_eq!(
            ImageStore::suggested_save_name(Path::new("/g/socket_image_1.png")).as_deref(),
            Some("socket_image_1_saved.png")
        );
        assert_eq!(
            ImageStore::suggested_save_name(Path::new("/g/plot")).as_deref(),
            Some("plot_saved")
        );
    }
}
