//! 64-bit path hash used to derive content addresses.
//!
//! The hash starts from the FNV-64 offset basis and, for every byte,
//! multiplies by the FNV-64 prime before XOR-ing the byte in. The result is
//! then masked with an all-ones 64-bit value. Stored objects are keyed by
//! this exact bit pattern, so the order of operations and the mask are kept
//! as they are even though the mask cannot change a `u64`.

use std::fmt::Write as _;

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;
const FULL_MASK: u64 = 0xffff_ffff_ffff_ffff;

/// Hashes `input` with the multiply-then-XOR variant described above.
#[must_use]
pub fn path_hash(input: &[u8]) -> u64 {
    let mut hash = OFFSET_BASIS;
    for &byte in input {
        hash = hash.wrapping_mul(PRIME);
        hash ^= u64::from(byte);
    }
    hash & FULL_MASK
}

/// [`path_hash`] rendered as 16 lowercase, zero-padded hex characters.
#[must_use]
pub fn path_hash_hex(input: &[u8]) -> String {
    let mut out = String::with_capacity(16);
    let _ = write!(out, "{:016x}", path_hash(input));
    out
}
