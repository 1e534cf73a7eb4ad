//! Pipeline configuration.
//!
//! [`ApplyOptions`] and [`CreateOptions`] are immutable once built. Both are
//! produced by a validating builder and deserialise through the same builder,
//! so options loaded from YAML or JSON get identical checks.

mod builder;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use streams::zlib::CompressionLevel;

pub use builder::{
    ApplyOptionsBuilder, BuilderError, CreateOptionsBuilder, DEFAULT_INDEX_WINDOW,
    DEFAULT_MAX_INPUT_CHUNK_SIZE, DEFAULT_RETRY_BUDGET,
};

/// Settings for [`apply_patch_group`](crate::apply_patch_group).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "ApplyOptionsBuilder")]
pub struct ApplyOptions {
    pub(super) destination_root: PathBuf,
    pub(super) previous_root: PathBuf,
    pub(super) workers: usize,
    pub(super) retry_budget: Duration,
    pub(super) temp_dir: Option<PathBuf>,
    pub(super) stream_chunk_size: usize,
    pub(super) skip_up_to_date: bool,
}

impl ApplyOptions {
    /// Starts building options.
    #[must_use]
    pub fn builder() -> ApplyOptionsBuilder {
        ApplyOptionsBuilder::new()
    }

    /// Directory the next build is written into.
    #[must_use]
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Directory holding the previous build.
    #[must_use]
    pub fn previous_root(&self) -> &Path {
        &self.previous_root
    }

    /// Configured worker count; `0` means one per CPU.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Retry budget for remote fetches.
    #[must_use]
    pub const fn retry_budget(&self) -> Duration {
        self.retry_budget
    }

    /// Directory for temp outputs, when one is configured.
    #[must_use]
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Chunk size for file streams.
    #[must_use]
    pub const fn stream_chunk_size(&self) -> usize {
        self.stream_chunk_size
    }

    /// Whether resources already holding the expected content are skipped.
    #[must_use]
    pub const fn skip_up_to_date(&self) -> bool {
        self.skip_up_to_date
    }
}

/// Settings for [`create_patch_group`](crate::create_patch_group).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "CreateOptionsBuilder")]
pub struct CreateOptions {
    pub(super) output_root: PathBuf,
    pub(super) max_input_chunk_size: u64,
    pub(super) index_window: usize,
    pub(super) match_window: usize,
    pub(super) shard_capacity: u64,
    pub(super) workers: usize,
    pub(super) stream_chunk_size: usize,
    pub(super) compression: CompressionLevel,
    pub(super) temp_dir: Option<PathBuf>,
}

impl CreateOptions {
    /// Starts building options.
    #[must_use]
    pub fn builder() -> CreateOptionsBuilder {
        CreateOptionsBuilder::new()
    }

    /// Directory patch payloads are stored under.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Size of the chunks changed resources are split into.
    #[must_use]
    pub const fn max_input_chunk_size(&self) -> u64 {
        self.max_input_chunk_size
    }

    /// Window length of the chunk index.
    #[must_use]
    pub const fn index_window(&self) -> usize {
        self.index_window
    }

    /// Window length of the block-move encoder.
    #[must_use]
    pub const fn match_window(&self) -> usize {
        self.match_window
    }

    /// Source offsets per index shard.
    #[must_use]
    pub const fn shard_capacity(&self) -> u64 {
        self.shard_capacity
    }

    /// Configured worker count; `0` means one per CPU.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Chunk size for file streams.
    #[must_use]
    pub const fn stream_chunk_size(&self) -> usize {
        self.stream_chunk_size
    }

    /// zlib level for stored payloads.
    #[must_use]
    pub const fn compression(&self) -> CompressionLevel {
        self.compression
    }

    /// Directory for index shards, when one is configured.
    #[must_use]
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }
}
