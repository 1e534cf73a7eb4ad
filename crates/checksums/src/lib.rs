#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod path_hash;
mod rolling;
pub mod strong;

pub use path_hash::{path_hash, path_hash_hex};
pub use rolling::{CHECKSUM_MODULUS, RollingChecksum, RollingError};
pub use strong::{ChecksumError, ChecksumStream, content_hash, md5_hex};
