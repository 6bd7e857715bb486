//! Writing generated files only when their content changes.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TempleError};

/// Write `contents` to `path` unless the file already holds exactly these
/// bytes. Returns whether the file was written.
///
/// A missing file always counts as changed.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    let previous = match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(TempleError::io(path, e)),
    };
    if previous.as_deref() == Some(contents.as_bytes()) {
        debug!(path = %path.display(), "unchanged");
        return Ok(false);
    }
    write_atomic(path, contents)?;
    debug!(path = %path.display(), "written");
    Ok(true)
}

/// Replace `path` with `contents` via a temporary file in the same
/// directory, so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| TempleError::io(dir, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| TempleError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| TempleError::io(path, e.error))?;
    Ok(())
}
