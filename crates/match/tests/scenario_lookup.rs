//! End-to-end lookups against an index built from a file on disk.

use std::fs;

use checksums::RollingChecksum;
use matching::{ChunkIndex, generate_checksum_filter};
use tempfile::tempdir;

fn sample(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 31 + i / 7) % 251) as u8)
        .collect()
}

#[test]
fn hundred_byte_window_at_offset_500_is_a_candidate() {
    let data = sample(10_000);
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("large.bin");
    fs::write(&source, &data).expect("write");

    let index = ChunkIndex::builder(100)
        .build(&source, dir.path().join("index"))
        .expect("index");
    let checksum = RollingChecksum::compute(&data[500..600]).value();
    let offsets = index.find_chunk_offsets(checksum).expect("lookup");
    assert!(offsets.contains(&500));

    let found = index
        .find_matching_chunk(&data[500..600])
        .expect("match")
        .expect("some offset");
    let found = found as usize;
    assert_eq!(&data[found..found + 100], &data[500..600]);
}

#[test]
fn filtered_index_finds_target_blocks_moved_in_source() {
    let previous = sample(6_000);
    let mut next = vec![0xEEu8; 200];
    next.extend_from_slice(&previous[1_000..3_000]);

    let dir = tempdir().expect("tempdir");
    let previous_path = dir.path().join("previous.bin");
    let next_path = dir.path().join("next.bin");
    fs::write(&previous_path, &previous).expect("write previous");
    fs::write(&next_path, &next).expect("write next");

    let filter = generate_checksum_filter(&next_path, 200).expect("filter");
    let index = ChunkIndex::builder(200)
        .shard_capacity(1_000)
        .filter(filter)
        .build(&previous_path, dir.path().join("index"))
        .expect("index");

    for block in 1..next.len() / 200 {
        let query = &next[block * 200..(block + 1) * 200];
        let found = index
            .find_matching_chunk(query)
            .expect("match")
            .expect("block present in previous build") as usize;
        assert_eq!(&previous[found..found + 200], query);
    }
}
