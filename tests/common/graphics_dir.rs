//! Builder for temporary graphics directories

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use plotsink::codec::{encode_png, Bitmap};

/// PNG bytes of a solid `width` x `height` image
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let bitmap = Bitmap::from_pixel(width, height, image::Rgba([30, 120, 200, 255]));
    encode_png(&bitmap).expect("Failed to encode PNG")
}

/// Temporary directory populated with image files
pub struct GraphicsDir {
    dir: TempDir,
}

impl GraphicsDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Canonical path, as the engine reports it
    pub fn canonical(&self) -> PathBuf {
        self.dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp dir")
    }

    /// Write a PNG and pin its modification time to `mtime_secs` after the epoch
    pub fn add_png(&self, name: &str, width: u32, height: u32, mtime_secs: u64) -> PathBuf {
        self.add_raw(name, &png_bytes(width, height), mtime_secs)
    }

    /// Write arbitrary bytes under an image name
    pub fn add_raw(&self, name: &str, bytes: &[u8], mtime_secs: u64) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).expect("Failed to write file");
        let file = fs::File::options()
            .write(true)
            .open(&path)
            .expect("Failed to reopen file");
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs))
            .expect("Failed to set mtime");
        self.canonical().join(name)
    }

    /// Image files currently on disk, sorted by name
    pub fn image_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.dir.path())
            .expect("Failed to read dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| plotsink::fs_utils::is_image_path(p))
            .collect();
        files.sort();
        files
    }
}
