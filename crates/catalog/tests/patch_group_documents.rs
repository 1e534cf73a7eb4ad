//! Hand-written patch-group documents.

use catalog::{CatalogError, PatchEntry, PatchGroup, content_address};

const DOCUMENT: &str = "\
Version: '0.2'
MaxInputChunkSize: 1048576
ResourceGroupResource:
  Version: '0.2'
  Resources:
    - Type: Resource
      RelativePath: res/world/terrain.dat
      ResourceType: res
      Location: 3f/3f00000000000000_11
      Checksum: '11'
      CompressedSize: 900
      UncompressedSize: 3000000
RemovedResourceRelativePaths:
  - res/world/legacy/old.dat
Resources:
  - Type: BinaryPatch
    RelativePath: res/world/terrain.dat.0.patch
    ResourceType: res
    TargetResourceRelativePath: res/world/terrain.dat
    DataOffset: 0
    SourceOffset: 0
    Location: 9a/9a00000000000000_22
    Checksum: '22'
    CompressedSize: 120
    UncompressedSize: 1048576
  - Type: BinaryPatch
    RelativePath: res/world/terrain.dat.2.patch
    ResourceType: res
    TargetResourceRelativePath: res/world/terrain.dat
    DataOffset: 2097152
    SourceOffset: 1048576
    Checksum: '33'
    CompressedSize: 0
    UncompressedSize: 1048576
  - Type: Resource
    RelativePath: res/world/new.dat
    ResourceType: res
    Location: 0c/0c00000000000000_44
    Checksum: '44'
    CompressedSize: 4
    UncompressedSize: 4
";

#[test]
fn document_decodes_into_typed_entries() {
    let group = PatchGroup::from_yaml_str(DOCUMENT).expect("parse");
    assert_eq!(group.max_input_chunk_size(), 1 << 20);
    assert_eq!(group.previous().len(), 1);
    assert_eq!(
        group.removed_resource_relative_paths(),
        ["res/world/legacy/old.dat".to_owned()]
    );

    let chunks = group.chunks_for("res/world/terrain.dat");
    assert_eq!(chunks.len(), 2);
    assert!(!chunks[0].is_verbatim());
    assert!(chunks[1].is_verbatim());
    assert_eq!(chunks[1].source_offset, 1 << 20);

    let kinds: Vec<_> = group.entries().iter().map(PatchEntry::kind).collect();
    assert_eq!(kinds, ["BinaryPatch", "BinaryPatch", "Resource"]);
}

#[test]
fn unknown_entry_kinds_fail_the_whole_document() {
    let broken = DOCUMENT.replace("  - Type: Resource\n    RelativePath: res/world/new.dat", "  - Type: Bundle\n    RelativePath: res/world/new.dat");
    let err = PatchGroup::from_yaml_str(&broken).expect_err("unknown kind");
    assert!(matches!(err, CatalogError::UnknownType(kind) if kind == "Bundle"));
}

#[test]
fn addresses_are_stable_across_calls() {
    let first = content_address("res", "res/world/new.dat", "44");
    let second = content_address("res", "res/world/new.dat", "44");
    assert_eq!(first, second);
    assert_ne!(first, content_address("res", "res/world/new.dat", "45"));
}
