//! # Overview
//!
//! Zlib-compressed counterparts of [`ByteStreamIn`](crate::ByteStreamIn) and
//! [`ByteStreamOut`](crate::ByteStreamOut). Resource payloads and patch
//! deltas are stored compressed; these types let callers read and write
//! them through the same [`ByteSource`] and [`ByteSink`] traits as plain
//! files.
//!
//! # Examples
//!
//! ```
//! use streams::ByteSink;
//! use streams::zlib::{CompressedByteStreamIn, CompressedByteStreamOut, CompressionLevel};
//!
//! # fn main() -> Result<(), streams::StreamError> {
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("payload.z");
//!
//! let mut out = CompressedByteStreamOut::create(&path, CompressionLevel::Default)?;
//! out.write(&b"abc".repeat(100))?;
//! let totals = out.finish()?;
//! assert_eq!(totals.uncompressed, 300);
//!
//! let mut input = CompressedByteStreamIn::open(&path, 64)?;
//! assert_eq!(input.read_to_end()?, b"abc".repeat(100));
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::{ByteSink, ByteSource, StreamError};

/// Compression levels accepted by [`CompressedByteStreamOut`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionLevel {
    /// Favour speed over ratio.
    Fast,
    /// zlib's default balance.
    #[default]
    Default,
    /// Favour ratio over speed.
    Best,
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Fast => Compression::fast(),
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Best => Compression::best(),
        }
    }
}

/// Byte totals reported by [`CompressedByteStreamOut::finish`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompressedTotals {
    /// Bytes accepted before compression.
    pub uncompressed: u64,
    /// Bytes written to the file.
    pub compressed: u64,
}

/// Sequential reader over a zlib-compressed file.
///
/// Positions refer to the decompressed stream. The reader cannot seek; use
/// [`ByteSource::skip`] to move forward.
pub struct CompressedByteStreamIn {
    path: PathBuf,
    decoder: ZlibDecoder<BufReader<File>>,
    chunk_size: usize,
    buffer: Vec<u8>,
    position: u64,
    finished: bool,
}

impl CompressedByteStreamIn {
    /// Opens the compressed file at `path`.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, StreamError> {
        if chunk_size == 0 {
            return Err(StreamError::InvalidChunkSize);
        }
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|error| StreamError::open(&path, error))?;
        Ok(Self {
            decoder: ZlibDecoder::new(BufReader::new(file)),
            path,
            chunk_size,
            buffer: vec![0u8; chunk_size],
            position: 0,
            finished: false,
        })
    }

    /// Decompresses everything that is left.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        if self.finished {
            return Ok(out);
        }
        self.decoder
            .read_to_end(&mut out)
            .map_err(|error| StreamError::read(&self.path, error))?;
        self.position = self.position.saturating_add(out.len() as u64);
        self.finished = true;
        Ok(out)
    }

    fn fill(&mut self, len: usize, use_internal: bool) -> Result<(usize, Vec<u8>), StreamError> {
        let mut external = if use_internal { Vec::new() } else { vec![0u8; len] };
        let mut filled = 0usize;
        while filled < len {
            let target = if use_internal {
                &mut self.buffer[filled..len]
            } else {
                &mut external[filled..len]
            };
            match self.decoder.read(target) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(StreamError::read(&self.path, error)),
            }
        }
        self.position = self.position.saturating_add(filled as u64);
        if filled < len {
            self.finished = true;
        }
        external.truncate(filled);
        Ok((filled, external))
    }
}

impl std::fmt::Debug for CompressedByteStreamIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedByteStreamIn")
            .field("path", &self.path)
            .field("chunk_size", &self.chunk_size)
            .field("position", &self.position)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl ByteSource for CompressedByteStreamIn {
    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn next_chunk(&mut self) -> Result<Option<&[u8]>, StreamError> {
        if self.finished {
            return Ok(None);
        }
        let (filled, _) = self.fill(self.chunk_size, true)?;
        if filled == 0 {
            return Ok(None);
        }
        Ok(Some(&self.buffer[..filled]))
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, StreamError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if self.finished {
            return Err(StreamError::Underrun {
                requested: len as u64,
                supplied: 0,
            });
        }
        let (filled, data) = self.fill(len, false)?;
        if filled < len {
            return Err(StreamError::Underrun {
                requested: len as u64,
                supplied: filled as u64,
            });
        }
        Ok(data)
    }

    fn skip(&mut self, len: u64) -> Result<(), StreamError> {
        let mut remaining = len;
        while remaining > 0 {
            let step = remaining.min(self.chunk_size as u64) as usize;
            let (filled, _) = if self.finished {
                (0, Vec::new())
            } else {
                self.fill(step, true)?
            };
            remaining -= filled as u64;
            if filled < step {
                return Err(StreamError::Underrun {
                    requested: len,
                    supplied: len - remaining,
                });
            }
        }
        Ok(())
    }

    fn current_position(&self) -> u64 {
        self.position
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Writer that zlib-compresses everything it is given into a file.
pub struct CompressedByteStreamOut {
    path: PathBuf,
    encoder: Option<ZlibEncoder<CountingWriter<BufWriter<File>>>>,
    totals: CompressedTotals,
}

impl CompressedByteStreamOut {
    /// Creates (or truncates) `path`, creating missing parent directories.
    pub fn create(path: impl AsRef<Path>, level: CompressionLevel) -> Result<Self, StreamError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| StreamError::open(parent, error))?;
        }
        let file = File::create(&path).map_err(|error| StreamError::open(&path, error))?;
        let writer = CountingWriter::new(BufWriter::new(file));
        Ok(Self {
            path,
            encoder: Some(ZlibEncoder::new(writer, level.into())),
            totals: CompressedTotals::default(),
        })
    }

    /// Finishes the zlib stream and closes the file.
    ///
    /// Later calls return the same totals.
    pub fn finish(&mut self) -> Result<CompressedTotals, StreamError> {
        if let Some(encoder) = self.encoder.take() {
            let counting = encoder
                .finish()
                .map_err(|error| StreamError::write(&self.path, error))?;
            self.totals.compressed = counting.bytes;
            let file = counting
                .inner
                .into_inner()
                .map_err(|error| StreamError::write(&self.path, error.into_error()))?;
            file.sync_all()
                .map_err(|error| StreamError::write(&self.path, error))?;
        }
        Ok(self.totals)
    }

    /// Path of the file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for CompressedByteStreamOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedByteStreamOut")
            .field("path", &self.path)
            .field("totals", &self.totals)
            .field("finished", &self.encoder.is_none())
            .finish()
    }
}

impl ByteSink for CompressedByteStreamOut {
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(StreamError::Finished {
                path: self.path.clone(),
            });
        };
        encoder
            .write_all(data)
            .map_err(|error| StreamError::write(&self.path, error))?;
        self.totals.uncompressed = self.totals.uncompressed.saturating_add(data.len() as u64);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.totals.uncompressed
    }
}

struct CountingWriter<W> {
    inner: W,
    bytes: u64,
}

impl<W> CountingWriter<W> {
    const fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Compresses `input` into a new [`Vec`].
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level.into());
    encoder.write_all(input)?;
    encoder.finish()
}

/// Decompresses `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(input);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_compressed(path: &Path, payload: &[u8]) -> CompressedTotals {
        let mut out = CompressedByteStreamOut::create(path, CompressionLevel::Default).expect("create");
        for piece in payload.chunks(7) {
            out.write(piece).expect("write");
        }
        out.finish().expect("finish")
    }

    #[test]
    fn totals_match_file_size() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.z");
        let payload = b"The quick brown fox jumps over the lazy dog".repeat(20);
        let totals = write_compressed(&path, &payload);

        assert_eq!(totals.uncompressed, payload.len() as u64);
        assert_eq!(totals.compressed, fs::metadata(&path).expect("meta").len());
        assert!(totals.compressed < totals.uncompressed);
        assert_eq!(decompress_to_vec(&fs::read(&path).expect("read")).expect("inflate"), payload);
    }

    #[test]
    fn finish_twice_returns_same_totals() {
        let dir = tempdir().expect("tempdir");
        let mut out =
            CompressedByteStreamOut::create(dir.path().join("x.z"), CompressionLevel::Fast).expect("create");
        out.write(b"abc").expect("write");
        let first = out.finish().expect("first");
        assert_eq!(out.finish().expect("second"), first);
        assert!(out.write(b"more").is_err());
    }

    #[test]
    fn chunked_reads_reassemble_payload() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.z");
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        write_compressed(&path, &payload);

        let mut input = CompressedByteStreamIn::open(&path, 512).expect("open");
        let mut seen = Vec::new();
        while let Some(chunk) = input.next_chunk().expect("chunk") {
            seen.extend_from_slice(chunk);
        }
        assert_eq!(seen, payload);
        assert!(input.is_finished());
        assert_eq!(input.current_position(), payload.len() as u64);
    }

    #[test]
    fn skip_then_read_exact() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.z");
        let payload: Vec<u8> = (0..=255u8).collect();
        write_compressed(&path, &payload);

        let mut input = CompressedByteStreamIn::open(&path, 16).expect("open");
        input.skip(100).expect("skip");
        assert_eq!(input.read(3).expect("read"), vec![100, 101, 102]);
        let err = input.read(500).expect_err("underrun");
        assert!(err.is_underrun());
    }

    #[test]
    fn empty_payload_round_trips() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.z");
        let totals = write_compressed(&path, b"");
        assert_eq!(totals.uncompressed, 0);
        assert!(totals.compressed > 0);

        let mut input = CompressedByteStreamIn::open(&path, 8).expect("open");
        assert!(input.next_chunk().expect("chunk").is_none());
    }

    #[test]
    fn helper_functions_round_trip() {
        let payload = b"highly compressible payload".repeat(4);
        let compressed = compress_to_vec(&payload, CompressionLevel::Best).expect("compress");
        assert_eq!(decompress_to_vec(&compressed).expect("decompress"), payload);
    }
}
