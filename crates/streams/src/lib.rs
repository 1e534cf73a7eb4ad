#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `streams` provides the file I/O primitives the patch engine is built on:
//! chunked sequential readers that can seek, append-only writers that count
//! what they wrote, zlib-compressed variants of both, and temp files that
//! delete themselves when they go out of scope.
//!
//! # Design
//!
//! Reading and writing go through two small traits instead of `Read`/`Write`
//! so that exact-length reads are explicit:
//!
//! - [`ByteSource`] hands out data in the stream's native chunk size via
//!   [`ByteSource::next_chunk`] and reads exact byte counts via
//!   [`ByteSource::read`], which fails with [`StreamError::Underrun`] when
//!   the stream ends early.
//! - [`ByteSink`] appends bytes and tracks the running total.
//!
//! [`ByteStreamIn`] and [`ByteStreamOut`] implement them over plain files;
//! [`zlib::CompressedByteStreamIn`] and [`zlib::CompressedByteStreamOut`]
//! wrap the same interfaces around a zlib stream built with
//! [`flate2`](https://docs.rs/flate2).
//!
//! # Invariants
//!
//! - A [`ByteStreamIn`] that reached end of stream must be reopened before it
//!   can seek again.
//! - [`ByteStreamOut::finish`] flushes and closes the file; later calls return
//!   the same total without touching the file.
//! - [`ScopedTempFile`] removes its file on drop unless it was persisted.
//!
//! # Examples
//!
//! ```
//! use streams::{ByteSink, ByteSource, ByteStreamIn, ByteStreamOut};
//!
//! # fn main() -> Result<(), streams::StreamError> {
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("payload.bin");
//!
//! let mut out = ByteStreamOut::create(&path)?;
//! out.write(b"hello ")?;
//! out.write(b"world")?;
//! assert_eq!(out.finish()?, 11);
//!
//! let mut input = ByteStreamIn::open(&path, 4)?;
//! assert_eq!(input.next_chunk()?, Some(&b"hell"[..]));
//! input.seek(6)?;
//! assert_eq!(input.read(5)?, b"world");
//! # Ok(())
//! # }
//! ```

mod error;
mod input;
mod output;
mod temp;
pub mod zlib;

pub use error::StreamError;
pub use input::ByteStreamIn;
pub use output::ByteStreamOut;
pub use temp::ScopedTempFile;

/// Chunk size used when callers have no better preference.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Sequential byte producer with a native chunk size.
pub trait ByteSource {
    /// Size of the chunks returned by [`next_chunk`](Self::next_chunk).
    fn chunk_size(&self) -> usize;

    /// Returns the next chunk of at most [`chunk_size`](Self::chunk_size)
    /// bytes, or `None` once the stream is exhausted.
    fn next_chunk(&mut self) -> Result<Option<&[u8]>, StreamError>;

    /// Reads exactly `len` bytes.
    ///
    /// Fails with [`StreamError::Underrun`] when the stream ends first; the
    /// bytes that were available are consumed.
    fn read(&mut self, len: usize) -> Result<Vec<u8>, StreamError>;

    /// Discards exactly `len` bytes.
    fn skip(&mut self, len: u64) -> Result<(), StreamError>;

    /// Number of bytes consumed from the start of the stream.
    fn current_position(&self) -> u64;

    /// Returns `true` once end of stream has been observed.
    fn is_finished(&self) -> bool;
}

/// Append-only byte consumer.
pub trait ByteSink {
    /// Appends `data` to the sink.
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError>;

    /// Total number of bytes accepted so far.
    fn bytes_written(&self) -> u64;
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.extend_from_slice(data);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.len() as u64
    }
}

/// Copies exactly `len` bytes from `source` to `sink` in the source's chunk
/// size, passing every piece to `observe` before it is written.
pub fn copy_exact<S, W, F>(
    source: &mut S,
    sink: &mut W,
    len: u64,
    mut observe: F,
) -> Result<(), StreamError>
where
    S: ByteSource + ?Sized,
    W: ByteSink + ?Sized,
    F: FnMut(&[u8]),
{
    let chunk = source.chunk_size().max(1) as u64;
    let mut remaining = len;
    while remaining > 0 {
        let step = remaining.min(chunk) as usize;
        let data = source.read(step)?;
        observe(&data);
        sink.write(&data)?;
        remaining -= step as u64;
    }
    Ok(())
}

/// Copies everything left in `source` to `sink`, returning the byte count.
pub fn copy_to_end<S, W, F>(source: &mut S, sink: &mut W, mut observe: F) -> Result<u64, StreamError>
where
    S: ByteSource + ?Sized,
    W: ByteSink + ?Sized,
    F: FnMut(&[u8]),
{
    let mut total = 0u64;
    while let Some(chunk) = source.next_chunk()? {
        observe(chunk);
        sink.write(chunk)?;
        total = total.saturating_add(chunk.len() as u64);
    }
    Ok(total)
}
