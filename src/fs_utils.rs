//! Filesystem helpers shared by the reconciler and the socket path
//!
//! - `is_image_path`: the fixed extension filter for the graphics directory
//! - `write_atomic`: write-then-rename so the watcher never sees a partial file
//! - `atomic_rename`: rename that also replaces the target on Windows
//! - `default_graphics_dir`: the temporary directory cleaned up on shutdown

use std::io;
use std::path::{Path, PathBuf};

/// Extensions recognized in the graphics directory (matched case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "svg"];

/// Whether `path` carries one of the recognized image extensions
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Normalize Windows paths by removing the `\\?\` prefix if present.
///
/// Watch events and directory scans must agree on path identity; on Windows
/// `canonicalize()` adds the extended-length prefix, which would make the
/// same file look like two different records.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use plotsink::fs_utils::normalize_path;
///
/// let path = PathBuf::from("/tmp/graphics");
/// assert_eq!(normalize_path(&path), path);
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        let s = path.to_string_lossy();
        if let Some(stripped) = s.strip_prefix(r"\\?\UNC\") {
            return PathBuf::from(format!(r"\\{}", stripped));
        }
        if let Some(stripped) = s.strip_prefix(r"\\?\") {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}

/// Canonicalize when possible, otherwise keep the path as given
pub fn canonical_or_self(path: &Path) -> PathBuf {
    path.canonicalize()
        .map(|p| normalize_path(&p))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Cross-platform atomic rename that handles Windows file replacement.
///
/// On Unix, `fs::rename` atomically replaces the target if it exists.
/// On Windows, `fs::rename` fails if the target exists, so the target is
/// deleted first.
pub fn atomic_rename(src: &Path, dst: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }
    }
    std::fs::rename(src, dst)
}

/// Write `bytes` to `dst` via a hidden sibling temp file and a rename.
///
/// The temp name ends in `.part`, which the image filter ignores, so a
/// directory watcher firing mid-write never picks up a truncated image.
pub fn write_atomic(dst: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = dst
        .file_name()
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name")
        })?;
    let tmp = dst.with_file_name(format!(".{}.part", file_name.to_string_lossy()));

    std::fs::write(&tmp, bytes)?;
    if let Err(e) = atomic_rename(&tmp, dst) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Default graphics directory: `<system temp>/graphics`
///
/// This is the only directory plotsink removes files from on its own.
pub fn default_graphics_dir() -> PathBuf {
    std::env::temp_dir().join("graphics")
}

/// Compare two directory paths, ignoring trailing separators and symlinks
pub fn same_directory(a: &Path, b: &Path) -> bool {
    canonical_or_self(a).components().eq(canonical_or_self(b).components())
}
