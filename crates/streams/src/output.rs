//! crates/streams/src/output.rs
//!
//! Append-only buffered file writer.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{ByteSink, StreamError};

/// Buffered file writer that counts the bytes it accepted.
#[derive(Debug)]
pub struct ByteStreamOut {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    bytes: u64,
}

impl ByteStreamOut {
    /// Creates (or truncates) `path`, creating missing parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| StreamError::open(parent, error))?;
        }
        let file = File::create(&path).map_err(|error| StreamError::open(&path, error))?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            bytes: 0,
        })
    }

    /// Flushes buffered data and closes the file, returning the total written.
    ///
    /// Calling `finish` again returns the same total.
    pub fn finish(&mut self) -> Result<u64, StreamError> {
        if let Some(writer) = self.writer.take() {
            let file = writer
                .into_inner()
                .map_err(|error| StreamError::write(&self.path, error.into_error()))?;
            file.sync_all()
                .map_err(|error| StreamError::write(&self.path, error))?;
        }
        Ok(self.bytes)
    }

    /// Returns `true` once [`finish`](Self::finish) has been called.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.writer.is_none()
    }

    /// Path of the file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSink for ByteStreamOut {
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(StreamError::Finished {
                path: self.path.clone(),
            });
        };
        writer
            .write_all(data)
            .map_err(|error| StreamError::write(&self.path, error))?;
        self.bytes = self.bytes.saturating_add(data.len() as u64);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_counts_bytes() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/out.bin");
        let mut out = ByteStreamOut::create(&path).expect("create");
        out.write(b"abc").expect("write");
        out.write(b"").expect("write empty");
        out.write(b"defg").expect("write");
        assert_eq!(out.bytes_written(), 7);
        assert_eq!(out.finish().expect("finish"), 7);
        assert_eq!(fs::read(&path).expect("read back"), b"abcdefg");
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let mut out = ByteStreamOut::create(dir.path().join("out.bin")).expect("create");
        out.write(b"xy").expect("write");
        assert_eq!(out.finish().expect("first"), 2);
        assert_eq!(out.finish().expect("second"), 2);
        assert!(out.is_finished());
    }

    #[test]
    fn write_after_finish_fails() {
        let dir = tempdir().expect("tempdir");
        let mut out = ByteStreamOut::create(dir.path().join("out.bin")).expect("create");
        out.finish().expect("finish");
        assert!(matches!(
            out.write(b"late").expect_err("finished"),
            StreamError::Finished { .. }
        ));
    }
}
