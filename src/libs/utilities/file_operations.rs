use crate::log_debug;
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Recursively copies the directory tree at `source` into `destination`.
///
/// `destination` is created if missing. Directories are recreated, regular files copied and
/// symlinks are followed so the copy is self-contained.
///
/// # Arguments
/// * `source` - Directory to copy from
/// * `destination` - Directory to copy into
///
/// # Returns
/// * `io::Result<u64>` - Number of files copied
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> io::Result<u64> {
    fs::create_dir_all(destination)?;
    let mut copied = 0;

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(io::Error::other)?;
        // `strip_prefix` cannot fail: every entry lives under `source`.
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    log_debug!(
        "[Utils] Copied {} file(s) from {} to {}",
        copied,
        source.display().to_string().dimmed(),
        destination.display().to_string().cyan()
    );
    Ok(copied)
}

/// Replaces `path` with `contents` atomically.
///
/// The data is written to a temporary file in the same directory and renamed over the
/// target, so a crash mid-write leaves either the old or the new file, never a torn one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Removes a directory tree if it exists. Returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
        return Ok(true);
    }
    Ok(false)
}
