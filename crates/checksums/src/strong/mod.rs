//! Strong (content) digests.
//!
//! [`ChecksumStream`] produces the MD5 hex strings recorded for every
//! resource; [`content_hash`] is the cheaper 64-bit digest used to confirm
//! that a candidate chunk really carries the queried bytes.

mod content;
mod stream;

pub use content::content_hash;
pub use stream::{ChecksumError, ChecksumStream, md5_hex};

/// Length in characters of a finalised [`ChecksumStream`] digest.
pub const CHECKSUM_HEX_LEN: usize = 32;
