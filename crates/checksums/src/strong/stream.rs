use std::fmt::{self, Write as _};

use digest::Digest;
use thiserror::Error;

/// Errors raised by [`ChecksumStream`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ChecksumError {
    /// The stream was already finalised.
    #[error("checksum stream was already finished")]
    AlreadyFinished,
}

/// Incremental MD5 accumulator that finalises to a lowercase hex string.
///
/// Chunks may be fed in any size; the result only depends on the
/// concatenated bytes. [`finish`](Self::finish) succeeds exactly once.
///
/// ```
/// use checksums::ChecksumStream;
///
/// let mut stream = ChecksumStream::new();
/// stream.update(b"chunk 1");
/// stream.update(b"chunk 2");
/// let hex = stream.finish().unwrap();
/// assert_eq!(hex, checksums::md5_hex(b"chunk 1chunk 2"));
/// assert!(stream.finish().is_err());
/// ```
#[derive(Clone)]
pub struct ChecksumStream {
    hasher: Option<md5::Md5>,
    bytes: u64,
}

impl ChecksumStream {
    /// Creates a stream with an empty digest state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: Some(md5::Md5::new()),
            bytes: 0,
        }
    }

    /// Feeds additional bytes into the digest state.
    ///
    /// Bytes supplied after [`finish`](Self::finish) are ignored.
    pub fn update(&mut self, data: &[u8]) {
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(data);
            self.bytes = self.bytes.saturating_add(data.len() as u64);
        }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub const fn bytes_consumed(&self) -> u64 {
        self.bytes
    }

    /// Returns `true` once the digest has been finalised.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.hasher.is_none()
    }

    /// Finalises the digest and returns it as 32 lowercase hex characters.
    pub fn finish(&mut self) -> Result<String, ChecksumError> {
        let hasher = self.hasher.take().ok_or(ChecksumError::AlreadyFinished)?;
        Ok(to_hex(&hasher.finalize()))
    }
}

impl Default for ChecksumStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChecksumStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecksumStream")
            .field("bytes", &self.bytes)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// One-shot MD5 of `data` as lowercase hex.
#[must_use]
pub fn md5_hex(data: &[u8]) -> String {
    to_hex(&md5::Md5::digest(data))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strong::CHECKSUM_HEX_LEN;

    #[test]
    fn empty_stream_matches_known_digest() {
        let mut stream = ChecksumStream::new();
        assert_eq!(
            stream.finish().expect("finish"),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn chunking_does_not_change_digest() {
        let payload = b"The quick brown fox jumps over the lazy dog".repeat(17);
        let whole = md5_hex(&payload);

        for size in [1, 3, 64, 1000] {
            let mut stream = ChecksumStream::new();
            for chunk in payload.chunks(size) {
                stream.update(chunk);
            }
            assert_eq!(stream.bytes_consumed(), payload.len() as u64);
            assert_eq!(stream.finish().expect("finish"), whole);
        }
    }

    #[test]
    fn second_finish_fails() {
        let mut stream = ChecksumStream::new();
        stream.update(b"abc");
        let hex = stream.finish().expect("first finish");
        assert_eq!(hex.len(), CHECKSUM_HEX_LEN);
        assert!(stream.is_finished());
        assert_eq!(stream.finish(), Err(ChecksumError::AlreadyFinished));
    }

    #[test]
    fn default_stream_accepts_data() {
        let mut stream = ChecksumStream::default();
        assert!(!stream.is_finished());
        stream.update(b"abc");
        assert_eq!(stream.finish().expect("finish"), md5_hex(b"abc"));
    }

    #[test]
    fn known_vector() {
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }
}
