use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the stream primitives.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A chunk size of zero was requested.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// The file could not be opened or created.
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Reading from the stream failed.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Writing to the stream failed.
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The stream ended before the requested number of bytes was available.
    #[error("stream ended after {supplied} of {requested} requested bytes")]
    Underrun {
        /// Bytes requested by the caller.
        requested: u64,
        /// Bytes the stream could supply.
        supplied: u64,
    },
    /// The input stream reached its end and must be reopened before seeking.
    #[error("stream '{}' is exhausted; reopen it before seeking", path.display())]
    Exhausted {
        /// Path of the exhausted stream.
        path: PathBuf,
    },
    /// The output stream was already finished.
    #[error("stream '{}' was already finished", path.display())]
    Finished {
        /// Path of the finished stream.
        path: PathBuf,
    },
    /// Moving a temp file into place failed.
    #[error("failed to move '{}' to '{}': {source}", from.display(), to.display())]
    Persist {
        /// Temp file path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for [`StreamError::Underrun`].
    #[must_use]
    pub const fn is_underrun(&self) -> bool {
        matches!(self, Self::Underrun { .. })
    }
}
