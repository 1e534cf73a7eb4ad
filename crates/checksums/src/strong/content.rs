use xxhash_rust::xxh3::xxh3_64;

/// 64-bit XXH3 digest of `data`.
///
/// Rolling checksums are narrow and collide; candidates they produce are
/// confirmed by comparing this digest of the candidate bytes with the
/// digest of the query.
#[inline]
#[must_use]
pub fn content_hash(data: &[u8]) -> u64 {
    xxh3_64(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bytes_hash_equal() {
        assert_eq!(content_hash(b"chunk"), content_hash(b"chunk"));
    }

    #[test]
    fn rolling_collisions_are_separated() {
        // Same bytes in swapped pairs share alpha but not content.
        assert_ne!(content_hash(b"ab"), content_hash(b"ba"));
    }
}
