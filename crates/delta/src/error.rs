use std::io;

use matching::MatchError;
use streams::StreamError;
use thiserror::Error;

/// Errors raised while creating or applying a delta.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// The container does not start with the expected magic.
    #[error("delta header is missing or malformed")]
    InvalidHeader,
    /// The payload ended in the middle of a control or data block.
    #[error("delta payload truncated: needed {needed} more bytes, {available} available")]
    Truncated {
        /// Bytes the decoder needed.
        needed: u64,
        /// Bytes left in the payload.
        available: u64,
    },
    /// A control triple is inconsistent with the source or target.
    #[error("malformed delta control: {reason}")]
    MalformedControl {
        /// Description of the inconsistency.
        reason: String,
    },
    /// A control addressed source bytes outside the source.
    #[error("delta reads source range {offset}..{end} but the source has {source_len} bytes")]
    SourceOutOfRange {
        /// Cursor position of the read.
        offset: i64,
        /// End of the read.
        end: i64,
        /// Source length.
        source_len: u64,
    },
    /// The payload describes more or less output than the header declares.
    #[error("delta produces {actual} bytes but the header declares {expected}")]
    LengthMismatch {
        /// Length from the header.
        expected: u64,
        /// Length the controls describe.
        actual: u64,
    },
    /// Bytes remained after the declared output was produced.
    #[error("{0} unexpected bytes after the last delta control")]
    TrailingData(u64),
    /// The declared target does not fit in memory on this platform.
    #[error("delta target of {0} bytes is too large for this platform")]
    TargetTooLarge(u64),
    /// Reading the source stream failed or ran short.
    #[error(transparent)]
    Source(#[from] StreamError),
    /// Writing reconstructed output failed.
    #[error("failed to write delta output: {0}")]
    Output(#[source] io::Error),
    /// The block matcher rejected its configuration.
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl DeltaError {
    /// Returns `true` when the source stream supplied fewer bytes than needed.
    #[must_use]
    pub const fn is_underrun(&self) -> bool {
        matches!(self, Self::Source(error) if error.is_underrun())
    }
}
