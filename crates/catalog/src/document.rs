//! crates/catalog/src/document.rs
//!
//! Wire form of document entries and the `Type` registry.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::version::{DocumentVersion, Field};
use crate::{CatalogError, PatchChunkRecord, ResourceRecord};

/// Encodings a document can be stored in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DocumentFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl DocumentFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Ok(Self::Yaml)
            }
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(CatalogError::UnknownFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub(crate) fn decode<T: DeserializeOwned>(self, text: &str) -> Result<T, CatalogError> {
        Ok(match self {
            Self::Yaml => serde_yaml::from_str(text)?,
            Self::Json => serde_json::from_str(text)?,
        })
    }

    pub(crate) fn encode<T: Serialize>(self, value: &T) -> Result<String, CatalogError> {
        Ok(match self {
            Self::Yaml => serde_yaml::to_string(value)?,
            Self::Json => serde_json::to_string_pretty(value)?,
        })
    }
}

pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let format = DocumentFormat::from_path(path)?;
    let text = fs::read_to_string(path).map_err(|error| CatalogError::io(path, error))?;
    format.decode(&text)
}

pub(crate) fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), CatalogError> {
    let text = DocumentFormat::from_path(path)?.encode(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| CatalogError::io(parent, error))?;
    }
    fs::write(path, text).map_err(|error| CatalogError::io(path, error))
}

/// Entry as written in a document, before its `Type` is resolved.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub(crate) struct RawEntry {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    relative_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uncompressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_resource_relative_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_offset: Option<u64>,
}

/// A decoded document entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PatchEntry {
    /// A whole resource taken from the next build.
    Resource(ResourceRecord),
    /// One chunk of a patched resource.
    BinaryPatch(PatchChunkRecord),
}

type Decoder = fn(RawEntry, DocumentVersion) -> Result<PatchEntry, CatalogError>;

/// Maps each `Type` discriminator to its decoder.
const REGISTRY: &[(&str, Decoder)] = &[
    (PatchEntry::RESOURCE, decode_resource),
    (PatchEntry::BINARY_PATCH, decode_binary_patch),
];

impl PatchEntry {
    /// Discriminator of plain resources.
    pub const RESOURCE: &'static str = "Resource";
    /// Discriminator of patch chunks.
    pub const BINARY_PATCH: &'static str = "BinaryPatch";

    /// The entry's `Type` discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Resource(_) => Self::RESOURCE,
            Self::BinaryPatch(_) => Self::BINARY_PATCH,
        }
    }

    /// Path of the resource the entry produces.
    #[must_use]
    pub fn target_path(&self) -> &str {
        match self {
            Self::Resource(record) => &record.relative_path,
            Self::BinaryPatch(chunk) => &chunk.target_resource_relative_path,
        }
    }

    pub(crate) fn decode(raw: RawEntry, version: DocumentVersion) -> Result<Self, CatalogError> {
        let decoder = REGISTRY
            .iter()
            .find(|(kind, _)| *kind == raw.kind)
            .map(|(_, decoder)| *decoder)
            .ok_or_else(|| CatalogError::UnknownType(raw.kind.clone()))?;
        decoder(raw, version)
    }

    pub(crate) fn encode(&self, version: DocumentVersion) -> RawEntry {
        match self {
            Self::Resource(record) => encode_resource(record, version),
            Self::BinaryPatch(chunk) => RawEntry {
                kind: Self::BINARY_PATCH.to_owned(),
                relative_path: Some(chunk.relative_path.clone()),
                resource_type: Some(chunk.resource_type.clone()),
                location: chunk.location.clone(),
                checksum: Some(chunk.checksum.clone()),
                compressed_size: version
                    .presence(Field::CompressedSize)
                    .emit(chunk.compressed_size),
                uncompressed_size: Some(chunk.uncompressed_size),
                target_resource_relative_path: Some(chunk.target_resource_relative_path.clone()),
                data_offset: Some(chunk.data_offset),
                source_offset: version.presence(Field::SourceOffset).emit(chunk.source_offset),
            },
        }
    }
}

pub(crate) fn encode_resource(record: &ResourceRecord, version: DocumentVersion) -> RawEntry {
    RawEntry {
        kind: PatchEntry::RESOURCE.to_owned(),
        relative_path: Some(record.relative_path.clone()),
        resource_type: Some(record.resource_type.clone()),
        location: Some(record.location.clone()),
        checksum: Some(record.checksum.clone()),
        compressed_size: version
            .presence(Field::CompressedSize)
            .emit(record.compressed_size),
        uncompressed_size: Some(record.uncompressed_size),
        ..RawEntry::default()
    }
}

pub(crate) fn decode_resource_only(
    raw: RawEntry,
    version: DocumentVersion,
    context: &'static str,
) -> Result<ResourceRecord, CatalogError> {
    match PatchEntry::decode(raw, version)? {
        PatchEntry::Resource(record) => Ok(record),
        other => Err(CatalogError::UnexpectedEntry {
            kind: other.kind(),
            context,
        }),
    }
}

fn required<T>(value: Option<T>, entry: &str, field: &'static str) -> Result<T, CatalogError> {
    value.ok_or_else(|| CatalogError::MissingField {
        entry: entry.to_owned(),
        field,
    })
}

fn decode_resource(raw: RawEntry, version: DocumentVersion) -> Result<PatchEntry, CatalogError> {
    let relative_path = required(raw.relative_path, "<unnamed>", "RelativePath")?;
    let name = relative_path.as_str();
    let uncompressed_size = required(raw.uncompressed_size, name, "UncompressedSize")?;
    let record = ResourceRecord {
        resource_type: required(raw.resource_type, name, "ResourceType")?,
        location: required(raw.location, name, "Location")?,
        checksum: required(raw.checksum, name, "Checksum")?,
        compressed_size: version.presence(Field::CompressedSize).resolve(
            raw.compressed_size,
            Field::CompressedSize,
            name,
            || uncompressed_size,
        )?,
        uncompressed_size,
        relative_path,
    };
    Ok(PatchEntry::Resource(record))
}

fn decode_binary_patch(raw: RawEntry, version: DocumentVersion) -> Result<PatchEntry, CatalogError> {
    let relative_path = required(raw.relative_path, "<unnamed>", "RelativePath")?;
    let name = relative_path.as_str();
    let data_offset = required(raw.data_offset, name, "DataOffset")?;
    let chunk = PatchChunkRecord {
        resource_type: required(raw.resource_type, name, "ResourceType")?,
        target_resource_relative_path: required(
            raw.target_resource_relative_path,
            name,
            "TargetResourceRelativePath",
        )?,
        data_offset,
        source_offset: version.presence(Field::SourceOffset).resolve(
            raw.source_offset,
            Field::SourceOffset,
            name,
            || data_offset,
        )?,
        location: raw.location,
        checksum: required(raw.checksum, name, "Checksum")?,
        compressed_size: version.presence(Field::CompressedSize).resolve(
            raw.compressed_size,
            Field::CompressedSize,
            name,
            || 0,
        )?,
        uncompressed_size: required(raw.uncompressed_size, name, "UncompressedSize")?,
        relative_path,
    };
    Ok(PatchEntry::BinaryPatch(chunk))
}
