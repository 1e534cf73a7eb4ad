//! crates/catalog/src/address.rs
//!
//! Storage keys for resource data.

use checksums::path_hash_hex;

/// Derives the storage location of a resource's content.
///
/// The key is `H[0..2]/H_checksum`, where `H` is the 16-character path hash
/// of `"<type>:/<relative_path>"`. The two-character prefix spreads objects
/// across directories.
///
/// ```
/// let location = catalog::content_address("res", "textures/a.dds", "d41d8cd98f00b204e9800998ecf8427e");
/// let (bucket, rest) = location.split_once('/').unwrap();
/// assert_eq!(bucket.len(), 2);
/// assert!(rest.starts_with(bucket));
/// assert!(rest.ends_with("_d41d8cd98f00b204e9800998ecf8427e"));
/// ```
#[must_use]
pub fn content_address(resource_type: &str, relative_path: &str, checksum: &str) -> String {
    let hash = path_hash_hex(format!("{resource_type}:/{relative_path}").as_bytes());
    format!("{}/{hash}_{checksum}", &hash[..2])
}
