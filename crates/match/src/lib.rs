#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Chunk matching between resource builds.
//!
//! This crate finds bytes a new build shares with the previous one:
//! - [`ChunkMatcher`] compares two in-memory buffers and reports maximal
//!   shared runs as [`ChunkMatch`] values
//! - [`ChunkIndex`] indexes every window of a large file into sorted shard
//!   files on disk and answers checksum and content lookups against them
//! - [`ChecksumFilter`] / [`generate_checksum_filter`] restrict an index to
//!   the windows a particular target file can ask for
//!
//! # Design
//!
//! Both searches fingerprint fixed-size windows with the rolling checksum
//! from the `checksums` crate, so consecutive windows cost O(1) each. The
//! matcher keeps its table in memory; the index streams its source through a
//! ring buffer and spills `(checksum, offset)` pairs to disk one shard at a
//! time, so memory stays bounded by the shard capacity.
//!
//! # Invariants
//!
//! - Matches never overlap on the destination side and are sorted by it.
//! - Shard *i* covers source offsets `[i × capacity, (i+1) × capacity)`; its
//!   records are sorted by checksum and only ever binary-searched.
//! - [`ChunkIndex::find_matching_chunk`] only returns offsets whose content
//!   hash equals the query's.

mod error;
mod filter;
mod index;
mod matcher;
mod ring_buffer;

pub use error::{IndexError, MatchError};
pub use filter::{ChecksumFilter, generate_checksum_filter};
pub use index::{ChunkIndex, ChunkIndexBuilder, DEFAULT_SHARD_CAPACITY, SHARD_RECORD_LEN};
pub use matcher::{ChunkMatch, ChunkMatcher, DEFAULT_MATCH_WINDOW, DEFAULT_MAX_CANDIDATES};
