//! File helpers shared by the file-backed stores and config.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{LexisError, Result};

/// Maximum file size that can be read into memory (10 MB).
///
/// Applies to config files and store documents. Append logs stream instead.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Read a file into a string, rejecting files over `MAX_FILE_SIZE`.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| LexisError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(LexisError::store(format!(
            "file {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| LexisError::storage(path, e))
}

/// Write `content` to `path` atomically.
///
/// The content goes to a hidden sibling temp file which is synced and then
/// renamed over the target, so readers see either the old or the new
/// document and never a partial one.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| LexisError::store(format!("{} has no parent directory", path.display())))?;
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| LexisError::storage(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.tmp", file_name));

    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| LexisError::storage(&temp_path, e))?;
        file.write_all(content)
            .map_err(|e| LexisError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| LexisError::storage(&temp_path, e))?;
    }

    // Rename is atomic on POSIX
    fs::rename(&temp_path, path).map_err(|e| LexisError::storage(path, e))
}
