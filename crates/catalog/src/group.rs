//! crates/catalog/src/group.rs
//!
//! The patch-group document handed from patch creation to patch application.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::RawCatalog;
use crate::document::{DocumentFormat, PatchEntry, RawEntry, read_document, write_document};
use crate::{Catalog, CatalogError, DocumentVersion, PatchChunkRecord, ResourceRecord};

/// Describes how to turn one build into the next.
///
/// The group embeds the previous build's catalog, lists one entry per new
/// resource and one per patch chunk, and names the paths to delete.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatchGroup {
    version: DocumentVersion,
    max_input_chunk_size: u64,
    previous: Catalog,
    entries: Vec<PatchEntry>,
    removed: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RawPatchGroup {
    #[serde(default)]
    version: DocumentVersion,
    max_input_chunk_size: u64,
    #[serde(default)]
    resource_group_resource: RawCatalog,
    #[serde(default)]
    removed_resource_relative_paths: Vec<String>,
    #[serde(default)]
    resources: Vec<RawEntry>,
}

impl PatchGroup {
    /// Creates a group at the current document version.
    #[must_use]
    pub fn new(
        max_input_chunk_size: u64,
        previous: Catalog,
        entries: Vec<PatchEntry>,
        removed: Vec<String>,
    ) -> Self {
        Self {
            version: DocumentVersion::CURRENT,
            max_input_chunk_size,
            previous,
            entries,
            removed,
        }
    }

    /// Document version.
    #[must_use]
    pub const fn version(&self) -> DocumentVersion {
        self.version
    }

    /// Largest chunk the group was created with.
    #[must_use]
    pub const fn max_input_chunk_size(&self) -> u64 {
        self.max_input_chunk_size
    }

    /// Catalog of the build the patches apply to.
    #[must_use]
    pub const fn previous(&self) -> &Catalog {
        &self.previous
    }

    /// Entries in document order.
    #[must_use]
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Brand-new resources.
    pub fn new_resources(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            PatchEntry::Resource(record) => Some(record),
            PatchEntry::BinaryPatch(_) => None,
        })
    }

    /// Every patch chunk in document order.
    pub fn chunks(&self) -> impl Iterator<Item = &PatchChunkRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            PatchEntry::BinaryPatch(chunk) => Some(chunk),
            PatchEntry::Resource(_) => None,
        })
    }

    /// Chunks targeting `relative_path`, in stored order.
    #[must_use]
    pub fn chunks_for(&self, relative_path: &str) -> Vec<&PatchChunkRecord> {
        self.chunks()
            .filter(|chunk| chunk.target_resource_relative_path == relative_path)
            .collect()
    }

    /// Paths to delete from the destination tree.
    #[must_use]
    pub fn removed_resource_relative_paths(&self) -> &[String] {
        &self.removed
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        Self::from_raw(DocumentFormat::Yaml.decode(text)?)
    }

    /// Renders the group as YAML.
    pub fn to_yaml_string(&self) -> Result<String, CatalogError> {
        DocumentFormat::Yaml.encode(&self.to_raw())
    }

    /// Parses a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        Self::from_raw(DocumentFormat::Json.decode(text)?)
    }

    /// Renders the group as JSON.
    pub fn to_json_string(&self) -> Result<String, CatalogError> {
        DocumentFormat::Json.encode(&self.to_raw())
    }

    /// Loads a group, choosing the format from the extension.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        Self::from_raw(read_document(path)?)
    }

    /// Writes the group, choosing the format from the extension.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        write_document(path, &self.to_raw())
    }

    fn from_raw(raw: RawPatchGroup) -> Result<Self, CatalogError> {
        let version = raw.version;
        let entries = raw
            .resources
            .into_iter()
            .map(|entry| PatchEntry::decode(entry, version))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            version,
            max_input_chunk_size: raw.max_input_chunk_size,
            previous: Catalog::from_raw(raw.resource_group_resource)?,
            entries,
            removed: raw.removed_resource_relative_paths,
        })
    }

    fn to_raw(&self) -> RawPatchGroup {
        RawPatchGroup {
            version: self.version,
            max_input_chunk_size: self.max_input_chunk_size,
            resource_group_resource: self.previous.to_raw(),
            removed_resource_relative_paths: self.removed.clone(),
            resources: self
                .entries
                .iter()
                .map(|entry| entry.encode(self.version))
                .collect(),
        }
    }
}
