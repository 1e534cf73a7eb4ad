//! crates/streams/src/temp.rs
//!
//! Temp files that remove themselves unless they are moved into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};

use crate::StreamError;

const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".tmp";

/// Uniquely named temp file that is deleted when dropped.
///
/// The file is created empty. Callers write to [`path`](Self::path) and
/// then either drop the value (discarding the file) or move it to its final
/// location with [`persist`](Self::persist) or
/// [`persist_noclobber`](Self::persist_noclobber).
#[derive(Debug)]
pub struct ScopedTempFile {
    path: TempPath,
}

impl ScopedTempFile {
    /// Creates a temp file in the system temp directory.
    pub fn new() -> Result<Self, StreamError> {
        Self::new_in(std::env::temp_dir())
    }

    /// Creates a temp file inside `dir`, creating the directory if needed.
    pub fn new_in(dir: impl AsRef<Path>) -> Result<Self, StreamError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|error| StreamError::open(dir, error))?;
        let file = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)
            .map_err(|error| StreamError::open(dir, error))?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Location of the temp file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the file to `destination`, replacing whatever is there.
    ///
    /// Falls back to copy-and-delete when the rename crosses file systems.
    pub fn persist(self, destination: impl AsRef<Path>) -> Result<(), StreamError> {
        let destination = destination.as_ref();
        match self.path.persist(destination) {
            Ok(()) => Ok(()),
            Err(error) if error.error.kind() == io::ErrorKind::CrossesDevices => {
                let temp = error.path;
                fs::copy(&temp, destination)
                    .map_err(|source| persist_error(&temp, destination, source))?;
                Ok(())
            }
            Err(error) => Err(persist_error(&error.path, destination, error.error)),
        }
    }

    /// Moves the file to `destination` only if nothing exists there yet.
    ///
    /// An occupied destination yields [`StreamError::Persist`] whose source
    /// has kind [`io::ErrorKind::AlreadyExists`]; the temp file is removed.
    pub fn persist_noclobber(self, destination: impl AsRef<Path>) -> Result<(), StreamError> {
        let destination = destination.as_ref();
        self.path
            .persist_noclobber(destination)
            .map_err(|error| persist_error(&error.path, destination, error.error))
    }
}

fn persist_error(from: &Path, to: &Path, source: io::Error) -> StreamError {
    StreamError::Persist {
        from: PathBuf::from(from),
        to: to.to_path_buf(),
        source,
    }
}
