#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `delta` implements the binary patch container used between resource
//! builds. A delta is a 16-byte `ENDSLEY/BSDIFF43` header, the target length
//! as a little-endian `u64`, and a bsdiff 4.3 control stream: `(add, copy,
//! seek)` triples of sign-magnitude integers, each followed by `add` diff
//! bytes that are added to the source and `copy` literal bytes.
//!
//! # Design
//!
//! Creation is split between a [`DeltaEncoder`], which only decides the
//! control triples, and the payload writer, which derives the diff and
//! literal bytes from the two inputs. [`BlockMoveEncoder`] is the default
//! strategy; it turns [`matching::ChunkMatcher`] runs into zero-diff adds and
//! covers the gaps with literals.
//!
//! Application is strict. [`apply_buffered`] works on in-memory inputs;
//! [`apply_streamed`] pulls exactly the source span it needs from a
//! [`streams::ByteSource`] and writes the target to any [`std::io::Write`].
//!
//! # Invariants
//!
//! - Every control stays inside the declared target length and every source
//!   read stays inside the source.
//! - A delta that leaves payload bytes unused after the target is complete
//!   is rejected.
//!
//! # Examples
//!
//! ```
//! use delta::{apply_buffered, create_delta, target_len};
//!
//! let patch = create_delta(b"old contents", b"new contents")?;
//! assert_eq!(target_len(&patch)?, 12);
//! assert_eq!(apply_buffered(b"old contents", &patch)?, b"new contents");
//! # Ok::<(), delta::DeltaError>(())
//! ```

mod apply;
mod container;
mod control;
mod encoder;
mod error;

pub use apply::{apply_buffered, apply_streamed};
pub use container::{HEADER_LEN, HEADER_MAGIC, create_delta, create_delta_with, target_len};
pub use control::{CONTROL_LEN, Control, INT_LEN, decode_int, encode_int};
pub use encoder::{BlockMoveEncoder, DeltaEncoder, PayloadStats};
pub use error::DeltaError;
