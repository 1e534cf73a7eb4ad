#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `catalog` holds the data model shared by patch creation and patch
//! application: [`ResourceRecord`]s grouped into a [`Catalog`] per build,
//! [`PatchChunkRecord`]s describing how a changed resource is rebuilt, and the
//! [`PatchGroup`] document that carries them between the two sides.
//! [`content_address`] derives the storage key of any stored object.
//!
//! # Design
//!
//! Documents are read and written with `serde`, as YAML through `serde_yaml`
//! or JSON through `serde_json`; [`DocumentFormat`] picks one from a file
//! extension. Entries carry a `Type` discriminator that is resolved through a
//! fixed registry into the closed [`PatchEntry`] enum, so unknown kinds are
//! rejected at load time.
//!
//! Every document is stamped with a [`DocumentVersion`]. Fields added after
//! the first version are listed in a capability table and resolved through
//! [`DocumentVersion::presence`]: a field is required once its introduction
//! version is reached, unless it was introduced in a minor version newer
//! than the document's own minor version, in which case it is optional.
//!
//! # Examples
//!
//! ```
//! use catalog::{Catalog, ResourceRecord};
//!
//! let catalog = Catalog::new(
//!     [ResourceRecord::new("res/ui/icon.png", "res", "5d41402abc4b2a76b9719d911017c592", 5)],
//!     ["res/ui/old.png".to_owned()],
//! )?;
//! let yaml = catalog.to_yaml_string()?;
//! assert_eq!(Catalog::from_yaml_str(&yaml)?, catalog);
//! # Ok::<(), catalog::CatalogError>(())
//! ```

mod address;
mod catalog;
mod document;
mod error;
mod group;
mod record;
mod version;

pub use address::content_address;
pub use catalog::Catalog;
pub use document::{DocumentFormat, PatchEntry};
pub use error::CatalogError;
pub use group::PatchGroup;
pub use record::{PatchChunkRecord, ResourceRecord};
pub use version::{DocumentVersion, Field, Presence};
