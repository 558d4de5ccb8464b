use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The text being patched: read once, transformed in memory, written once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} is not valid UTF-8 text")]
    InvalidUtf8(PathBuf),

    #[error("Permission denied writing {0}")]
    WritePermissionDenied(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read the whole file as UTF-8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => DocumentError::FileNotFound(path.to_path_buf()),
            _ => DocumentError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let text =
            String::from_utf8(bytes).map_err(|_| DocumentError::InvalidUtf8(path.to_path_buf()))?;
        Ok(Self::new(path, text))
    }

    /// Copy the loaded text to `snapshot` before the source is overwritten.
    pub fn snapshot(&self, snapshot: &Path) -> Result<(), DocumentError> {
        write_atomic(snapshot, &self.text)?;
        tracing::debug!(from = %self.path.display(), to = %snapshot.display(), "snapshot written");
        Ok(())
    }
}

/// Atomic file write: tempfile + fsync + rename, then bump mtime.
///
/// Either the full write succeeds or the target is left untouched. An existing
/// target keeps its permissions.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), DocumentError> {
    let map_err = |source: std::io::Error| match source.kind() {
        ErrorKind::PermissionDenied => DocumentError::WritePermissionDenied(path.to_path_buf()),
        _ => DocumentError::Write {
            path: path.to_path_buf(),
            source,
        },
    };

    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(map_err)?;
    temp.write_all(content.as_bytes()).map_err(map_err)?;
    if let Ok(existing) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(map_err)?;
    }
    temp.as_file().sync_all().map_err(map_err)?;
    temp.persist(path).map_err(|e| map_err(e.error))?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now).map_err(map_err)?;

    Ok(())
}
