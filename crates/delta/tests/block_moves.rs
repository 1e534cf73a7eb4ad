//! Round trips over realistic build-to-build changes.

use delta::{BlockMoveEncoder, Control, DeltaEncoder, apply_buffered, create_delta_with};

fn build(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

#[test]
fn reordered_blocks_need_almost_no_literals() {
    let a = build(1, 4096);
    let b = build(2, 4096);
    let c = build(3, 4096);
    let source = [a.as_slice(), &b, &c].concat();
    let target = [c.as_slice(), &a, &b].concat();

    let (patch, stats) =
        create_delta_with(&BlockMoveEncoder::new(32).expect("window"), &source, &target)
            .expect("create");
    assert_eq!(stats.extra_bytes, 0);
    assert_eq!(stats.diff_bytes, target.len() as u64);
    assert_eq!(stats.controls, 3);
    assert_eq!(apply_buffered(&source, &patch).expect("apply"), target);
}

#[test]
fn inserted_and_removed_ranges_round_trip() {
    let source = build(7, 20_000);
    let mut target = source[..5_000].to_vec();
    target.extend_from_slice(b"freshly inserted bytes");
    target.extend_from_slice(&source[9_000..]);

    let (patch, stats) =
        create_delta_with(&BlockMoveEncoder::default(), &source, &target).expect("create");
    assert!(stats.extra_bytes <= 22, "{} literal bytes", stats.extra_bytes);
    assert_eq!(apply_buffered(&source, &patch).expect("apply"), target);
}

struct LiteralOnly;

impl DeltaEncoder for LiteralOnly {
    fn controls(&self, _source: &[u8], target: &[u8]) -> Result<Vec<Control>, delta::DeltaError> {
        Ok(vec![Control::new(0, target.len() as u64, 0)])
    }
}

#[test]
fn custom_encoders_produce_valid_containers() {
    let source = build(11, 300);
    let target = build(12, 500);
    let (patch, stats) = create_delta_with(&LiteralOnly, &source, &target).expect("create");
    assert_eq!(stats.extra_bytes, 500);
    assert_eq!(apply_buffered(&source, &patch).expect("apply"), target);
}
