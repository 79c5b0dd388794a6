//! Whole-file replacement that never leaves a truncated target behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{InstallError, Result};

/// Write `contents` to `path` through a temp file in the same directory and
/// rename it over the target.
///
/// Parent directories are created as needed. Permissions of an existing
/// target are carried over to the replacement.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| InstallError::write(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| InstallError::write(path, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.flush())
        .map_err(|e| InstallError::write(path, e))?;

    if let Ok(meta) = fs::metadata(path) {
        let _ = tmp.as_file().set_permissions(meta.permissions());
    }

    tmp.persist(path)
        .map_err(|e| InstallError::write(path, e.error))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

/// Read a file that may not exist yet.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(InstallError::read(path, e)),
    }
}
