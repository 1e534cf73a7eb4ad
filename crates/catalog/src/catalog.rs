//! crates/catalog/src/catalog.rs
//!
//! Build snapshots.

use std::collections::BTreeSet;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::document::{
    DocumentFormat, RawEntry, decode_resource_only, encode_resource, read_document, write_document,
};
use crate::{CatalogError, DocumentVersion, ResourceRecord};

/// Every resource of one build plus the paths the build removed.
///
/// Records keep their document order. A catalog is not modified after it is
/// built or loaded.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Catalog {
    version: DocumentVersion,
    resources: Vec<ResourceRecord>,
    index: FxHashMap<String, usize>,
    removed: BTreeSet<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawCatalog {
    #[serde(default)]
    version: DocumentVersion,
    #[serde(default)]
    resources: Vec<RawEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    removed_resource_relative_paths: Vec<String>,
}

impl Catalog {
    /// Builds a catalog at the current document version.
    pub fn new(
        resources: impl IntoIterator<Item = ResourceRecord>,
        removed: impl IntoIterator<Item = String>,
    ) -> Result<Self, CatalogError> {
        Self::with_version(DocumentVersion::CURRENT, resources, removed)
    }

    /// Builds a catalog stamped with `version`.
    pub fn with_version(
        version: DocumentVersion,
        resources: impl IntoIterator<Item = ResourceRecord>,
        removed: impl IntoIterator<Item = String>,
    ) -> Result<Self, CatalogError> {
        let resources: Vec<ResourceRecord> = resources.into_iter().collect();
        let mut index = FxHashMap::default();
        for (position, record) in resources.iter().enumerate() {
            if index.insert(record.relative_path.clone(), position).is_some() {
                return Err(CatalogError::DuplicateResource(record.relative_path.clone()));
            }
        }
        Ok(Self {
            version,
            resources,
            index,
            removed: removed.into_iter().collect(),
        })
    }

    /// Document version the catalog was read at or will be written at.
    #[must_use]
    pub const fn version(&self) -> DocumentVersion {
        self.version
    }

    /// Records in document order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceRecord] {
        &self.resources
    }

    /// Looks a record up by relative path.
    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&ResourceRecord> {
        self.index
            .get(relative_path)
            .and_then(|&position| self.resources.get(position))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` when the catalog holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Paths removed relative to the previous build, sorted.
    pub fn removed_resource_relative_paths(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().map(String::as_str)
    }

    /// Parses a YAML catalog.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        Self::from_raw(DocumentFormat::Yaml.decode(text)?)
    }

    /// Renders the catalog as YAML.
    pub fn to_yaml_string(&self) -> Result<String, CatalogError> {
        DocumentFormat::Yaml.encode(&self.to_raw())
    }

    /// Parses a JSON catalog.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        Self::from_raw(DocumentFormat::Json.decode(text)?)
    }

    /// Renders the catalog as JSON.
    pub fn to_json_string(&self) -> Result<String, CatalogError> {
        DocumentFormat::Json.encode(&self.to_raw())
    }

    /// Loads a catalog, choosing the format from the extension.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        Self::from_raw(read_document(path)?)
    }

    /// Writes the catalog, choosing the format from the extension.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        write_document(path, &self.to_raw())
    }

    pub(crate) fn from_raw(raw: RawCatalog) -> Result<Self, CatalogError> {
        let version = raw.version;
        let resources = raw
            .resources
            .into_iter()
            .map(|entry| decode_resource_only(entry, version, "a catalog"))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_version(version, resources, raw.removed_resource_relative_paths)
    }

    pub(crate) fn to_raw(&self) -> RawCatalog {
        RawCatalog {
            version: self.version,
            resources: self
                .resources
                .iter()
                .map(|record| encode_resource(record, self.version))
                .collect(),
            removed_resource_relative_paths: self.removed.iter().cloned().collect(),
        }
    }
}
