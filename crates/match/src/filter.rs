//! crates/match/src/filter.rs
//!
//! Checksum filters restrict a chunk index to windows a target can ask for.

use std::path::Path;

use checksums::RollingChecksum;
use rustc_hash::FxHashSet;
use streams::{ByteSource, ByteStreamIn};

use crate::IndexError;
use crate::index::validate_window;

/// Set of rolling checksums of a target's chunk-aligned windows.
#[derive(Clone, Debug)]
pub struct ChecksumFilter {
    window: usize,
    checksums: FxHashSet<u32>,
}

impl ChecksumFilter {
    /// Fingerprints every complete `window`-byte block of `data`.
    pub fn from_bytes(data: &[u8], window: usize) -> Result<Self, IndexError> {
        validate_window(window)?;
        let checksums = data
            .chunks_exact(window)
            .map(|block| RollingChecksum::compute(block).value())
            .collect();
        Ok(Self { window, checksums })
    }

    /// Returns `true` when `checksum` belongs to one of the target's blocks.
    #[must_use]
    pub fn contains(&self, checksum: u32) -> bool {
        self.checksums.contains(&checksum)
    }

    /// Window length the filter was built with.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Number of distinct checksums.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checksums.len()
    }

    /// Returns `true` when the target had no complete block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checksums.is_empty()
    }
}

/// Streams `target` in `window`-sized blocks and collects their checksums.
///
/// A trailing partial block is ignored; it can never equal a full window.
pub fn generate_checksum_filter(
    target: impl AsRef<Path>,
    window: usize,
) -> Result<ChecksumFilter, IndexError> {
    validate_window(window)?;
    let mut input = ByteStreamIn::open(target, window)?;
    let mut checksums = FxHashSet::default();
    while let Some(block) = input.next_chunk()? {
        if block.len() == window {
            checksums.insert(RollingChecksum::compute(block).value());
        }
    }
    Ok(ChecksumFilter { window, checksums })
}
