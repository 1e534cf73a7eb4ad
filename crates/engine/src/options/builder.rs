//! Builders for [`ApplyOptions`] and [`CreateOptions`].
//!
//! Both builders validate at build time and double as the serde shape of the
//! options, so a YAML or JSON options file goes through the same checks as
//! code that calls the builder directly.
//!
//! # Example
//!
//! ```rust
//! use engine::ApplyOptions;
//!
//! let options = ApplyOptions::builder()
//!     .destination_root("/srv/game/current")
//!     .workers(4)
//!     .build()
//!     .expect("valid options");
//! assert_eq!(options.workers(), 4);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use streams::DEFAULT_CHUNK_SIZE;
use streams::zlib::CompressionLevel;

use super::{ApplyOptions, CreateOptions};
use matching::{DEFAULT_MATCH_WINDOW, DEFAULT_SHARD_CAPACITY};

/// Retry budget used when none is configured.
pub const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(120);

/// Chunk size patch creation splits resources into by default.
pub const DEFAULT_MAX_INPUT_CHUNK_SIZE: u64 = 1 << 20;

/// Window length of the chunk index used by patch creation by default.
pub const DEFAULT_INDEX_WINDOW: usize = 64;

/// Errors that can occur when building options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BuilderError {
    /// An invalid combination of options was specified.
    InvalidCombination {
        /// Description of the invalid combination.
        message: String,
    },
    /// A required option is missing.
    MissingRequiredOption {
        /// Name of the missing option.
        option: &'static str,
    },
    /// An option value is out of range.
    ValueOutOfRange {
        /// Name of the option with invalid value.
        option: &'static str,
        /// Description of the valid range.
        range: String,
    },
}

impl std::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCombination { message } => {
                write!(f, "invalid option combination: {message}")
            }
            Self::MissingRequiredOption { option } => {
                write!(f, "missing required option: {option}")
            }
            Self::ValueOutOfRange { option, range } => {
                write!(f, "value out of range for {option}: expected {range}")
            }
        }
    }
}

impl std::error::Error for BuilderError {}

fn positive(option: &'static str, value: u64) -> Result<(), BuilderError> {
    if value == 0 {
        return Err(BuilderError::ValueOutOfRange {
            option,
            range: "a value greater than zero".to_owned(),
        });
    }
    Ok(())
}

/// Builder for [`ApplyOptions`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplyOptionsBuilder {
    destination_root: Option<PathBuf>,
    previous_root: Option<PathBuf>,
    workers: usize,
    retry_budget_secs: u64,
    temp_dir: Option<PathBuf>,
    stream_chunk_size: usize,
    skip_up_to_date: bool,
}

impl Default for ApplyOptionsBuilder {
    fn default() -> Self {
        Self {
            destination_root: None,
            previous_root: None,
            workers: 0,
            retry_budget_secs: DEFAULT_RETRY_BUDGET.as_secs(),
            temp_dir: None,
            stream_chunk_size: DEFAULT_CHUNK_SIZE,
            skip_up_to_date: true,
        }
    }
}

impl ApplyOptionsBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory the next build is written into. Required.
    pub fn destination_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.destination_root = Some(root.into());
        self
    }

    /// Directory holding the previous build. Defaults to the destination.
    pub fn previous_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.previous_root = Some(root.into());
        self
    }

    /// Worker threads; `0` uses one per CPU and `1` runs sequentially.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Total time remote fetches may spend retrying.
    pub fn retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget_secs = budget.as_secs();
        self
    }

    /// Directory for temp outputs; defaults to each destination's parent.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Chunk size for file streams.
    pub fn stream_chunk_size(mut self, size: usize) -> Self {
        self.stream_chunk_size = size;
        self
    }

    /// Skip resources whose destination already has the expected checksum.
    pub fn skip_up_to_date(mut self, skip: bool) -> Self {
        self.skip_up_to_date = skip;
        self
    }

    fn validate(&self) -> Result<(), BuilderError> {
        if self.destination_root.is_none() {
            return Err(BuilderError::MissingRequiredOption {
                option: "destination_root",
            });
        }
        positive("stream_chunk_size", self.stream_chunk_size as u64)
    }

    /// Validates and builds the options.
    pub fn build(self) -> Result<ApplyOptions, BuilderError> {
        self.validate()?;
        let destination_root = self
            .destination_root
            .ok_or(BuilderError::MissingRequiredOption {
                option: "destination_root",
            })?;
        Ok(ApplyOptions {
            previous_root: self
                .previous_root
                .unwrap_or_else(|| destination_root.clone()),
            destination_root,
            workers: self.workers,
            retry_budget: Duration::from_secs(self.retry_budget_secs),
            temp_dir: self.temp_dir,
            stream_chunk_size: self.stream_chunk_size,
            skip_up_to_date: self.skip_up_to_date,
        })
    }
}

impl TryFrom<ApplyOptionsBuilder> for ApplyOptions {
    type Error = BuilderError;

    fn try_from(builder: ApplyOptionsBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

/// Builder for [`CreateOptions`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateOptionsBuilder {
    output_root: Option<PathBuf>,
    max_input_chunk_size: u64,
    index_window: usize,
    match_window: usize,
    shard_capacity: u64,
    workers: usize,
    stream_chunk_size: usize,
    #[serde(skip)]
    compression: CompressionLevel,
    temp_dir: Option<PathBuf>,
}

impl Default for CreateOptionsBuilder {
    fn default() -> Self {
        Self {
            output_root: None,
            max_input_chunk_size: DEFAULT_MAX_INPUT_CHUNK_SIZE,
            index_window: DEFAULT_INDEX_WINDOW,
            match_window: DEFAULT_MATCH_WINDOW,
            shard_capacity: DEFAULT_SHARD_CAPACITY,
            workers: 0,
            stream_chunk_size: DEFAULT_CHUNK_SIZE,
            compression: CompressionLevel::Default,
            temp_dir: None,
        }
    }
}

impl CreateOptionsBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory patch payloads are stored under. Required.
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = Some(root.into());
        self
    }

    /// Size of the chunks each changed resource is split into.
    pub fn max_input_chunk_size(mut self, size: u64) -> Self {
        self.max_input_chunk_size = size;
        self
    }

    /// Window length of the chunk index; must divide the chunk size.
    pub fn index_window(mut self, window: usize) -> Self {
        self.index_window = window;
        self
    }

    /// Window length the delta encoder matches blocks with.
    pub fn match_window(mut self, window: usize) -> Self {
        self.match_window = window;
        self
    }

    /// Source offsets covered by each index shard.
    pub fn shard_capacity(mut self, capacity: u64) -> Self {
        self.shard_capacity = capacity;
        self
    }

    /// Worker threads; `0` uses one per CPU and `1` runs sequentially.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Chunk size for file streams.
    pub fn stream_chunk_size(mut self, size: usize) -> Self {
        self.stream_chunk_size = size;
        self
    }

    /// zlib level for stored payloads.
    pub fn compression(mut self, level: CompressionLevel) -> Self {
        self.compression = level;
        self
    }

    /// Directory for index shards; defaults to the system temp directory.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn validate(&self) -> Result<(), BuilderError> {
        if self.output_root.is_none() {
            return Err(BuilderError::MissingRequiredOption {
                option: "output_root",
            });
        }
        positive("max_input_chunk_size", self.max_input_chunk_size)?;
        positive("index_window", self.index_window as u64)?;
        positive("match_window", self.match_window as u64)?;
        positive("shard_capacity", self.shard_capacity)?;
        positive("stream_chunk_size", self.stream_chunk_size as u64)?;
        if self.shard_capacity > u64::from(u32::MAX) + 1 {
            return Err(BuilderError::ValueOutOfRange {
                option: "shard_capacity",
                range: format!("at most {}", u64::from(u32::MAX) + 1),
            });
        }
        if self.max_input_chunk_size % self.index_window as u64 != 0 {
            return Err(BuilderError::InvalidCombination {
                message: format!(
                    "index_window {} does not divide max_input_chunk_size {}",
                    self.index_window, self.max_input_chunk_size
                ),
            });
        }
        Ok(())
    }

    /// Validates and builds the options.
    pub fn build(self) -> Result<CreateOptions, BuilderError> {
        self.validate()?;
        let output_root = self.output_root.ok_or(BuilderError::MissingRequiredOption {
            option: "output_root",
        })?;
        Ok(CreateOptions {
            output_root,
            max_input_chunk_size: self.max_input_chunk_size,
            index_window: self.index_window,
            match_window: self.match_window,
            shard_capacity: self.shard_capacity,
            workers: self.workers,
            stream_chunk_size: self.stream_chunk_size,
            compression: self.compression,
            temp_dir: self.temp_dir,
        })
    }
}

impl TryFrom<CreateOptionsBuilder> for CreateOptions {
    type Error = BuilderError;

    fn try_from(builder: CreateOptionsBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_requires_destination() {
        let err = ApplyOptionsBuilder::new().build().expect_err("missing root");
        assert_eq!(
            err,
            BuilderError::MissingRequiredOption {
                option: "destination_root"
            }
        );
    }

    #[test]
    fn apply_defaults() {
        let options = ApplyOptionsBuilder::new()
            .destination_root("/tmp/next")
            .build()
            .expect("options");
        assert_eq!(options.previous_root(), options.destination_root());
        assert_eq!(options.retry_budget(), DEFAULT_RETRY_BUDGET);
        assert_eq!(options.stream_chunk_size(), DEFAULT_CHUNK_SIZE);
        assert!(options.skip_up_to_date());
        assert_eq!(options.workers(), 0);
    }

    #[test]
    fn zero_chunk_size_is_out_of_range() {
        let err = ApplyOptionsBuilder::new()
            .destination_root("/tmp/next")
            .stream_chunk_size(0)
            .build()
            .expect_err("zero chunk");
        assert!(matches!(
            err,
            BuilderError::ValueOutOfRange {
                option: "stream_chunk_size",
                ..
            }
        ));
    }

    #[test]
    fn create_window_must_divide_chunk_size() {
        let err = CreateOptionsBuilder::new()
            .output_root("/tmp/patches")
            .max_input_chunk_size(1000)
            .index_window(64)
            .build()
            .expect_err("misaligned window");
        assert!(matches!(err, BuilderError::InvalidCombination { .. }));

        let options = CreateOptionsBuilder::new()
            .output_root("/tmp/patches")
            .max_input_chunk_size(1024)
            .index_window(64)
            .build()
            .expect("aligned");
        assert_eq!(options.max_input_chunk_size(), 1024);
    }

    #[test]
    fn oversized_shards_are_rejected() {
        let err = CreateOptionsBuilder::new()
            .output_root("/tmp/patches")
            .shard_capacity(u64::from(u32::MAX) + 2)
            .build()
            .expect_err("too large");
        assert!(matches!(
            err,
            BuilderError::ValueOutOfRange {
                option: "shard_capacity",
                ..
            }
        ));
    }

    #[test]
    fn errors_render_option_names() {
        let err = BuilderError::ValueOutOfRange {
            option: "workers",
            range: "1..=64".into(),
        };
        assert_eq!(err.to_string(), "value out of range for workers: expected 1..=64");
    }
}
