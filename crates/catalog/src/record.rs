//! crates/catalog/src/record.rs
//!
//! Resource and patch-chunk records.

use crate::content_address;

/// One resource as it exists in one build.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ResourceRecord {
    /// Path relative to the tree root, `/`-separated.
    pub relative_path: String,
    /// Path scheme the resource lives under, such as `res` or `app`.
    pub resource_type: String,
    /// Storage location of the content.
    pub location: String,
    /// MD5 of the uncompressed content as lowercase hex.
    pub checksum: String,
    /// Size of the stored object.
    pub compressed_size: u64,
    /// Size of the resource on disk.
    pub uncompressed_size: u64,
}

impl ResourceRecord {
    /// Creates a record whose location is derived from its identity and checksum.
    pub fn new(
        relative_path: impl Into<String>,
        resource_type: impl Into<String>,
        checksum: impl Into<String>,
        uncompressed_size: u64,
    ) -> Self {
        let relative_path = relative_path.into();
        let resource_type = resource_type.into();
        let checksum = checksum.into();
        let location = content_address(&resource_type, &relative_path, &checksum);
        Self {
            relative_path,
            resource_type,
            location,
            checksum,
            compressed_size: uncompressed_size,
            uncompressed_size,
        }
    }

    /// Overrides the stored object size.
    #[must_use]
    pub fn with_compressed_size(mut self, compressed_size: u64) -> Self {
        self.compressed_size = compressed_size;
        self
    }
}

/// One contiguous range of a resource's next version.
///
/// Bytes `[data_offset, data_offset + uncompressed_size)` of the target come
/// from applying the delta stored at `location` to the previous resource
/// starting at `source_offset`, or, when `location` is absent, from copying
/// `uncompressed_size` bytes of the previous resource at `source_offset`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PatchChunkRecord {
    /// Name of the patch object itself.
    pub relative_path: String,
    /// Path scheme of the target resource.
    pub resource_type: String,
    /// Resource this chunk belongs to.
    pub target_resource_relative_path: String,
    /// Offset of the chunk in the next version.
    pub data_offset: u64,
    /// Offset in the previous version the chunk is built from.
    pub source_offset: u64,
    /// Storage location of the delta; `None` for a verbatim copy.
    pub location: Option<String>,
    /// MD5 of the stored delta, or of the copied bytes for a verbatim copy.
    pub checksum: String,
    /// Size of the stored delta; zero for a verbatim copy.
    pub compressed_size: u64,
    /// Length of the chunk in the next version.
    pub uncompressed_size: u64,
}

impl PatchChunkRecord {
    /// Returns `true` when the chunk is copied from the previous version
    /// without a delta.
    #[must_use]
    pub const fn is_verbatim(&self) -> bool {
        self.location.is_none()
    }

    /// One past the last target byte the chunk produces.
    #[must_use]
    pub const fn data_end(&self) -> u64 {
        self.data_offset.saturating_add(self.uncompressed_size)
    }

    /// Name of the patch object for chunk number `index` of `target`.
    #[must_use]
    pub fn object_name(target: &str, index: usize) -> String {
        format!("{target}.{index}.patch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_derives_its_location() {
        let record = ResourceRecord::new("a/b.txt", "res", "00ff", 10);
        assert_eq!(record.location, content_address("res", "a/b.txt", "00ff"));
        assert_eq!(record.compressed_size, 10);
        assert_eq!(record.with_compressed_size(4).compressed_size, 4);
    }

    #[test]
    fn chunk_ranges_and_names() {
        let chunk = PatchChunkRecord {
            relative_path: PatchChunkRecord::object_name("big.bin", 3),
            resource_type: "res".into(),
            target_resource_relative_path: "big.bin".into(),
            data_offset: 300,
            source_offset: 120,
            location: None,
            checksum: String::new(),
            compressed_size: 0,
            uncompressed_size: 100,
        };
        assert!(chunk.is_verbatim());
        assert_eq!(chunk.data_end(), 400);
        assert_eq!(chunk.relative_path, "big.bin.3.patch");
    }
}
