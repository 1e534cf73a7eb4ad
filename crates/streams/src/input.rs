//! crates/streams/src/input.rs
//!
//! Chunked, seekable file reader.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::{ByteSource, StreamError};

/// Sequential file reader that hands out fixed-size chunks.
///
/// The reader tracks its position and whether end of file has been seen.
/// Once exhausted it refuses to [`seek`](Self::seek) until
/// [`reopen`](Self::reopen) is called.
#[derive(Debug)]
pub struct ByteStreamIn {
    path: PathBuf,
    file: File,
    chunk_size: usize,
    buffer: Vec<u8>,
    position: u64,
    len: u64,
    finished: bool,
}

impl ByteStreamIn {
    /// Opens `path` for chunked reading.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, StreamError> {
        if chunk_size == 0 {
            return Err(StreamError::InvalidChunkSize);
        }
        let path = path.as_ref().to_path_buf();
        let (file, len) = open_with_len(&path)?;
        Ok(Self {
            path,
            file,
            chunk_size,
            buffer: vec![0u8; chunk_size],
            position: 0,
            len,
            finished: false,
        })
    }

    /// Reopens the underlying file and rewinds to the start.
    pub fn reopen(&mut self) -> Result<(), StreamError> {
        let (file, len) = open_with_len(&self.path)?;
        self.file = file;
        self.len = len;
        self.position = 0;
        self.finished = false;
        Ok(())
    }

    /// Moves the read position to `position` bytes from the start.
    pub fn seek(&mut self, position: u64) -> Result<(), StreamError> {
        if self.finished {
            return Err(StreamError::Exhausted {
                path: self.path.clone(),
            });
        }
        if position != self.position {
            self.file
                .seek(SeekFrom::Start(position))
                .map_err(|error| StreamError::read(&self.path, error))?;
            self.position = position;
        }
        Ok(())
    }

    /// Size of the file when it was (re)opened.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` when the file was empty when opened.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn account(&mut self, filled: usize, requested: usize) {
        self.position = self.position.saturating_add(filled as u64);
        if filled < requested {
            self.finished = true;
        }
    }
}

/// Reads into `buf` until it is full or the file ends, returning the byte count.
fn fill(file: &mut File, path: &Path, buf: &mut [u8]) -> Result<usize, StreamError> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(StreamError::read(path, error)),
        }
    }
    Ok(filled)
}

impl ByteSource for ByteStreamIn {
    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn next_chunk(&mut self) -> Result<Option<&[u8]>, StreamError> {
        if self.finished {
            return Ok(None);
        }
        let filled = fill(&mut self.file, &self.path, &mut self.buffer)?;
        self.account(filled, self.chunk_size);
        if filled == 0 {
            return Ok(None);
        }
        Ok(Some(&self.buffer[..filled]))
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, StreamError> {
        let mut out = vec![0u8; len];
        if len == 0 {
            return Ok(out);
        }
        let filled = if self.finished {
            0
        } else {
            let filled = fill(&mut self.file, &self.path, &mut out)?;
            self.account(filled, len);
            filled
        };
        if filled < len {
            return Err(StreamError::Underrun {
                requested: len as u64,
                supplied: filled as u64,
            });
        }
        Ok(out)
    }

    fn skip(&mut self, len: u64) -> Result<(), StreamError> {
        let target = self.position.saturating_add(len);
        if target > self.len {
            let supplied = self.len.saturating_sub(self.position);
            self.position = self.len;
            self.finished = true;
            return Err(StreamError::Underrun {
                requested: len,
                supplied,
            });
        }
        self.seek(target)
    }

    fn current_position(&self) -> u64 {
        self.position
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

fn open_with_len(path: &Path) -> Result<(File, u64), StreamError> {
    let file = File::open(path).map_err(|error| StreamError::open(path, error))?;
    let len = file
        .metadata()
        .map_err(|error| StreamError::open(path, error))?
        .len();
    Ok((file, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn fixture(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("input.bin");
        fs::write(&path, contents).expect("write fixture");
        (dir, path)
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let (_dir, path) = fixture(b"abc");
        let err = ByteStreamIn::open(&path, 0).expect_err("zero chunk");
        assert!(matches!(err, StreamError::InvalidChunkSize));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempdir().expect("tempdir");
        let err = ByteStreamIn::open(dir.path().join("missing"), 8).expect_err("missing");
        assert!(matches!(err, StreamError::Open { .. }));
    }

    #[test]
    fn chunks_cover_whole_file() {
        let (_dir, path) = fixture(b"0123456789");
        let mut input = ByteStreamIn::open(&path, 4).expect("open");
        assert_eq!(input.len(), 10);

        let mut seen = Vec::new();
        while let Some(chunk) = input.next_chunk().expect("chunk") {
            assert!(chunk.len() <= 4);
            seen.extend_from_slice(chunk);
        }
        assert_eq!(seen, b"0123456789");
        assert!(input.is_finished());
        assert_eq!(input.current_position(), 10);
    }

    #[test]
    fn seek_then_read_exact() {
        let (_dir, path) = fixture(b"0123456789");
        let mut input = ByteStreamIn::open(&path, 3).expect("open");
        input.seek(4).expect("seek");
        assert_eq!(input.read(3).expect("read"), b"456");
        assert_eq!(input.current_position(), 7);
    }

    #[test]
    fn read_past_end_underruns() {
        let (_dir, path) = fixture(b"abc");
        let mut input = ByteStreamIn::open(&path, 8).expect("open");
        let err = input.read(5).expect_err("underrun");
        match err {
            StreamError::Underrun {
                requested,
                supplied,
            } => {
                assert_eq!(requested, 5);
                assert_eq!(supplied, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(input.is_finished());
    }

    #[test]
    fn exhausted_stream_requires_reopen_to_seek() {
        let (_dir, path) = fixture(b"abc");
        let mut input = ByteStreamIn::open(&path, 8).expect("open");
        while input.next_chunk().expect("chunk").is_some() {}
        assert!(matches!(
            input.seek(0).expect_err("exhausted"),
            StreamError::Exhausted { .. }
        ));

        input.reopen().expect("reopen");
        input.seek(1).expect("seek after reopen");
        assert_eq!(input.read(2).expect("read"), b"bc");
    }

    #[test]
    fn skip_advances_and_detects_short_files() {
        let (_dir, path) = fixture(b"abcdef");
        let mut input = ByteStreamIn::open(&path, 2).expect("open");
        input.skip(2).expect("skip");
        assert_eq!(input.read(1).expect("read"), b"c");
        assert!(input.skip(10).expect_err("short").is_underrun());
    }
}
