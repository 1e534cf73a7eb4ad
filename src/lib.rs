#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `respatch` distributes versioned resource trees as compact binary
//! patches. This crate is the facade over the workspace:
//!
//! - [`checksums`]: rolling window checksums, streamed MD5, path hashing
//! - [`streams`]: chunked file streams, zlib variants, scoped temp files
//! - [`matching`]: in-memory chunk matching and the on-disk chunk index
//! - [`delta`]: the `ENDSLEY/BSDIFF43` delta container
//! - [`fetch`]: downloads with bounded exponential backoff
//! - [`catalog`]: resource records, catalogs and patch-group documents
//! - [`engine`]: the create and apply pipelines
//! - [`logging`]: tracing targets and subscriber setup
//!
//! The pipeline entry points are re-exported at the root.
//!
//! # Examples
//!
//! ```
//! use respatch::{Verbosity, PatchContext};
//!
//! let context = PatchContext::new(Verbosity::Verbose).with_progress(|event| {
//!     if let respatch::ProgressEvent::Resource { relative_path, completed, total, .. } = event {
//!         println!("{completed}/{total} {relative_path}");
//!     }
//! });
//! assert_eq!(context.verbosity(), Verbosity::Verbose);
//! ```

pub use catalog;
pub use checksums;
pub use delta;
pub use engine;
pub use fetch;
pub use logging;
pub use matching;
pub use streams;

pub use catalog::{Catalog, PatchChunkRecord, PatchEntry, PatchGroup, ResourceRecord, content_address};
pub use engine::{
    ApplyOptions, ApplySources, ApplySummary, BuildTrees, CreateOptions, DirectorySource,
    PatchContext, PatchError, PatchErrorKind, PatchResult, ProgressEvent, RemoteSource,
    ResourceChanges, ResourceOutcome, ResourceSource, apply_patch_group, create_patch_group,
};
pub use logging::{Verbosity, init_tracing};
