#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` turns one build of a resource tree into the next. It has two
//! pipelines that share a data model from the `catalog` crate:
//!
//! - [`create_patch_group`] splits every changed resource into fixed-size
//!   chunks, finds where each chunk came from in the previous version, and
//!   stores a compressed binary delta for every chunk that cannot simply be
//!   copied. The result is a [`PatchGroup`](catalog::PatchGroup).
//! - [`apply_patch_group`] rebuilds each resource of the next catalog from
//!   the previous tree, the stored deltas and a next-build source, verifies
//!   it against its recorded checksum and moves it into place. Removed
//!   resources are deleted afterwards.
//!
//! # Design
//!
//! Each resource is an independent job. Jobs run on a bounded rayon pool
//! whose size comes from [`ApplyOptions`] / [`CreateOptions`]; one worker
//! runs them inline. Every output is written to a scoped temp file and only
//! renamed over the destination after its checksum matched, so a failed
//! resource never leaves a partial file behind.
//!
//! Bytes that are not in the previous tree come through the
//! [`ResourceSource`] trait: [`DirectorySource`] reads a local tree or
//! content-addressed store, [`RemoteSource`] downloads through a retrying
//! fetcher.
//!
//! Verbosity and the progress observer travel in a [`PatchContext`] passed to
//! every call; nothing is global.
//!
//! # Invariants
//!
//! - Chunks of one resource are applied in stored order; a chunk starting
//!   before the previous one ends is reported as
//!   [`PatchErrorKind::InvalidDocument`].
//! - A resource whose reconstructed checksum differs from its record fails
//!   with [`PatchErrorKind::ChecksumMismatch`] and is not written.
//! - Relative paths from documents never resolve outside their root.
//!
//! # Examples
//!
//! ```
//! use catalog::{Catalog, ResourceRecord};
//! use engine::{ApplyOptions, ApplySources, DirectorySource, PatchContext, apply_patch_group};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let next_tree = dir.path().join("next");
//! std::fs::create_dir_all(&next_tree)?;
//! std::fs::write(next_tree.join("hello.txt"), b"hello")?;
//!
//! let record = ResourceRecord::new("hello.txt", "res", checksums::md5_hex(b"hello"), 5);
//! let next = Catalog::new([record], Vec::<String>::new())?;
//! let group = catalog::PatchGroup::new(1 << 20, Catalog::default(), Vec::new(), Vec::new());
//!
//! let options = ApplyOptions::builder().destination_root(dir.path().join("out")).build()?;
//! let next_source = DirectorySource::tree(&next_tree);
//! let patches = DirectorySource::store(dir.path().join("patches"));
//! let summary = apply_patch_group(
//!     &PatchContext::default(),
//!     &options,
//!     &group,
//!     &next,
//!     ApplySources { next: &next_source, patches: &patches },
//! )?;
//! assert_eq!(summary.copied(), 1);
//! assert_eq!(std::fs::read(dir.path().join("out/hello.txt"))?, b"hello");
//! # Ok(())
//! # }
//! ```

mod apply;
mod context;
mod create;
mod error;
pub mod options;
mod pool;
mod remove;
mod source;

pub use apply::{ApplySources, ApplySummary, apply_patch_group, file_checksum};
pub use context::{PatchContext, ProgressEvent, ResourceOutcome};
pub use create::{BuildTrees, ResourceChanges, create_patch_group};
pub use error::{PatchError, PatchErrorKind, PatchResult};
pub use options::{ApplyOptions, CreateOptions};
pub use remove::remove_resources;
pub use source::{
    DirectorySource, ObjectRef, OpenedResource, RemoteSource, ResourceSource, join_relative,
};
