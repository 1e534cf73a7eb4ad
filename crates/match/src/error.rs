use std::io;
use std::path::PathBuf;

use checksums::RollingError;
use streams::StreamError;
use thiserror::Error;

/// Errors raised by [`ChunkMatcher`](crate::ChunkMatcher).
#[derive(Debug, Error)]
pub enum MatchError {
    /// The window is zero or too large for a rolling checksum.
    #[error("match window must be between 1 and {max} bytes, got {window}")]
    InvalidWindow {
        /// Requested window length.
        window: usize,
        /// Largest accepted window.
        max: usize,
    },
    /// The rolling checksum rejected a window.
    #[error(transparent)]
    Rolling(#[from] RollingError),
}

/// Errors raised while building or querying a [`ChunkIndex`](crate::ChunkIndex).
#[derive(Debug, Error)]
pub enum IndexError {
    /// The window is zero or too large for a rolling checksum.
    #[error("index window must be between 1 and {max} bytes, got {window}")]
    InvalidWindow {
        /// Requested window length.
        window: usize,
        /// Largest accepted window.
        max: usize,
    },
    /// Shard offsets must fit the 32-bit relative offset field.
    #[error("shard capacity must be between 1 and 2^32 windows, got {capacity}")]
    InvalidShardCapacity {
        /// Requested capacity.
        capacity: u64,
    },
    /// The checksum filter was built with a different window length.
    #[error("checksum filter window {filter} does not match index window {index}")]
    FilterWindowMismatch {
        /// Window of the filter.
        filter: usize,
        /// Window of the index.
        index: usize,
    },
    /// The indexed (or filtered) file could not be read.
    #[error(transparent)]
    Source(#[from] StreamError),
    /// A shard file could not be created or written.
    #[error("failed to write index shard '{}': {source}", path.display())]
    ShardWrite {
        /// Shard path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A shard file could not be read back.
    #[error("failed to read index shard '{}': {source}", path.display())]
    ShardRead {
        /// Shard path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Candidate bytes could not be read from the indexed file.
    #[error("failed to read candidate at offset {offset} of '{}': {source}", path.display())]
    CandidateRead {
        /// Indexed file.
        path: PathBuf,
        /// Candidate offset.
        offset: u64,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The rolling checksum rejected a window.
    #[error(transparent)]
    Rolling(#[from] RollingError),
}
