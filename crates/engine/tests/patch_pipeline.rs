//! Patch creation followed by patch application over real trees.

use std::path::Path;

use catalog::{Catalog, PatchGroup};
use engine::{
    ApplyOptions, ApplySources, BuildTrees, CreateOptions, DirectorySource, PatchContext,
    ResourceChanges, apply_patch_group, create_patch_group,
};
use proptest::prelude::*;
use test_support::{FileTree, TestDir, catalog_for, deterministic_bytes, record_for};

fn changes_between(previous: &FileTree, next: &FileTree) -> ResourceChanges {
    let mut changes = ResourceChanges::default();
    for (path, data) in next.files() {
        match previous.get(path) {
            Some(old) if old == data.as_slice() => {}
            Some(old) => changes
                .changed
                .push((record_for(path, "res", old), record_for(path, "res", data))),
            None => changes.added.push(record_for(path, "res", data)),
        }
    }
    for path in previous.files().keys() {
        if next.get(path).is_none() {
            changes.removed.push(path.clone());
        }
    }
    changes
}

struct Run {
    dir: TestDir,
    group: PatchGroup,
    next: Catalog,
}

fn create(previous: &FileTree, next: &FileTree, chunk: u64, workers: usize) -> Run {
    let dir = TestDir::new().expect("test dir");
    previous.create_in(&dir.subdir("previous").expect("mkdir")).expect("previous tree");
    next.create_in(&dir.subdir("next").expect("mkdir")).expect("next tree");

    let options = CreateOptions::builder()
        .output_root(dir.join("patches"))
        .max_input_chunk_size(chunk)
        .index_window(16)
        .match_window(8)
        .shard_capacity(256)
        .workers(workers)
        .build()
        .expect("create options");
    let group = create_patch_group(
        &PatchContext::default(),
        &options,
        &catalog_for(previous, "res"),
        &changes_between(previous, next),
        BuildTrees {
            previous: &dir.join("previous"),
            next: &dir.join("next"),
        },
    )
    .expect("create");
    Run {
        group,
        next: catalog_for(next, "res"),
        dir,
    }
}

fn apply(run: &Run, destination: &Path, workers: usize) -> engine::ApplySummary {
    let options = ApplyOptions::builder()
        .destination_root(destination)
        .previous_root(run.dir.join("previous"))
        .workers(workers)
        .stream_chunk_size(37)
        .build()
        .expect("apply options");
    apply_patch_group(
        &PatchContext::default(),
        &options,
        &run.group,
        &run.next,
        ApplySources {
            next: &DirectorySource::tree(run.dir.join("next")),
            patches: &DirectorySource::store(run.dir.join("patches")),
        },
    )
    .expect("apply")
}

fn edited(base: &[u8], seed: u64) -> Vec<u8> {
    let mut data = base.to_vec();
    let noise = deterministic_bytes(seed, 64);
    for (step, byte) in noise.iter().enumerate().take(8) {
        let at = (usize::from(*byte) * 37 + step * 911) % data.len();
        data[at] ^= 0x5a;
    }
    let insert_at = data.len() / 2;
    data.splice(insert_at..insert_at, noise.iter().copied());
    let drop_at = data.len() * 3 / 4;
    let drop_len = (data.len() / 30).max(1);
    data.drain(drop_at..drop_at + drop_len);
    data
}

#[test]
fn edits_fit_small_resources() {
    for len in [1, 100, 3_000] {
        let base = deterministic_bytes(9, len);
        let changed = edited(&base, 4);
        assert_ne!(changed, base);
    }
}

#[test]
fn large_resources_round_trip_through_chunks() {
    let base = deterministic_bytes(1, 8_000);
    let mut previous = FileTree::new();
    previous
        .binary_file("res/world/terrain.dat", &base)
        .text_file("res/ui/strings.txt", "hello")
        .text_file("res/legacy/old.txt", "bye");
    let mut next = FileTree::new();
    next.binary_file("res/world/terrain.dat", &edited(&base, 2))
        .text_file("res/ui/strings.txt", "hello, world")
        .binary_file("res/new/blob.bin", &deterministic_bytes(3, 700));

    let run = create(&previous, &next, 1024, 2);
    assert!(run.group.chunks().count() > 0);

    let destination = run.dir.subdir("destination").expect("mkdir");
    let summary = apply(&run, &destination, 2);
    assert_eq!(summary.patched() + summary.copied(), 3);
    assert_eq!(FileTree::read_from(&destination).expect("read"), next);
}

#[test]
fn reordered_blocks_become_verbatim_chunks() {
    let a = deterministic_bytes(10, 512);
    let b = deterministic_bytes(11, 512);
    let c = deterministic_bytes(12, 512);
    let mut previous = FileTree::new();
    previous.binary_file("pak.bin", &[a.clone(), b.clone(), c.clone()].concat());
    let mut next = FileTree::new();
    next.binary_file("pak.bin", &[c, a, b].concat());

    let run = create(&previous, &next, 512, 1);
    assert!(run.group.chunks().all(|chunk| chunk.is_verbatim()));
    let destination = run.dir.subdir("destination").expect("mkdir");
    apply(&run, &destination, 1);
    assert_eq!(FileTree::read_from(&destination).expect("read"), next);
}

#[test]
fn chunk_size_does_not_change_the_result() {
    let base = deterministic_bytes(20, 6_000);
    let mut previous = FileTree::new();
    previous.binary_file("f.bin", &base);
    let mut next = FileTree::new();
    next.binary_file("f.bin", &edited(&base, 21));

    for chunk in [64, 512, 1 << 20] {
        let run = create(&previous, &next, chunk, 1);
        let destination = run.dir.subdir("destination").expect("mkdir");
        apply(&run, &destination, 1);
        assert_eq!(
            FileTree::read_from(&destination).expect("read"),
            next,
            "chunk size {chunk}"
        );
    }
}

#[test]
fn applying_in_place_over_the_previous_tree() {
    let base = deterministic_bytes(30, 3_000);
    let mut previous = FileTree::new();
    previous.binary_file("f.bin", &base).text_file("gone/x.txt", "x");
    let mut next = FileTree::new();
    next.binary_file("f.bin", &edited(&base, 31));

    let run = create(&previous, &next, 256, 1);
    let in_place = run.dir.join("previous");
    let options = ApplyOptions::builder()
        .destination_root(&in_place)
        .workers(1)
        .build()
        .expect("options");
    let summary = apply_patch_group(
        &PatchContext::default(),
        &options,
        &run.group,
        &run.next,
        ApplySources {
            next: &DirectorySource::tree(run.dir.join("next")),
            patches: &DirectorySource::store(run.dir.join("patches")),
        },
    )
    .expect("apply");
    assert_eq!(summary.removed(), 1);
    assert_eq!(FileTree::read_from(&in_place).expect("read"), next);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn arbitrary_edits_round_trip(
        old in proptest::collection::vec(any::<u8>(), 0..2_000),
        new in proptest::collection::vec(any::<u8>(), 0..2_000),
    ) {
        let mut previous = FileTree::new();
        previous.binary_file("f.bin", &old);
        let mut next = FileTree::new();
        next.binary_file("f.bin", &new);

        let run = create(&previous, &next, 128, 1);
        let destination = run.dir.subdir("destination").expect("mkdir");
        apply(&run, &destination, 1);
        prop_assert_eq!(FileTree::read_from(&destination).expect("read"), next);
    }
}
