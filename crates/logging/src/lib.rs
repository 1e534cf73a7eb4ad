#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` holds the tracing conventions shared by every crate in the
//! workspace: one target per subsystem, a macro per target, a [`Verbosity`]
//! setting that callers carry explicitly, and subscriber initialisation that
//! turns a verbosity into an [`EnvFilter`](tracing_subscriber::EnvFilter).
//!
//! # Design
//!
//! Library crates only emit events through the `trace_*` macros; they never
//! install a subscriber. Binaries and tests call [`init_tracing`] (or
//! [`try_init_tracing`]) once. `RUST_LOG` takes precedence over the
//! verbosity-derived directives so individual targets can be tuned without
//! code changes.
//!
//! # Examples
//!
//! ```
//! use logging::{Verbosity, targets, trace_apply};
//!
//! let verbosity = Verbosity::from_level(2);
//! assert_eq!(verbosity, Verbosity::Verbose);
//! assert!(verbosity.directives().contains(targets::ROOT));
//!
//! trace_apply!(path = "res/a.bin", "resource patched");
//! ```

mod subscriber;
mod tracing_macros;
mod verbosity;

pub use subscriber::{InitError, env_filter, init_tracing, try_init_tracing};
pub use verbosity::Verbosity;

/// Tracing targets used by the workspace.
pub mod targets {
    /// Common prefix of every target.
    pub const ROOT: &str = "respatch";
    /// Per-resource apply pipeline.
    pub const APPLY: &str = "respatch::apply";
    /// Patch creation.
    pub const CREATE: &str = "respatch::create";
    /// Chunk index construction and lookups.
    pub const INDEX: &str = "respatch::index";
    /// Delta encoding and decoding.
    pub const DELTA: &str = "respatch::delta";
    /// Remote fetches and retries.
    pub const FETCH: &str = "respatch::fetch";
    /// Removal of deleted resources and directory pruning.
    pub const DELETE: &str = "respatch::delete";
}
