#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Shared fixtures for integration tests.
//!
//! - [`TestDir`] is a self-deleting directory with helpers to write and read
//!   files by relative path.
//! - [`FileTree`] describes a set of files and materialises it in a
//!   directory.
//! - [`deterministic_bytes`] produces reproducible pseudo-random content.
//! - [`catalog_for`] builds the catalog of a tree on disk.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use catalog::{Catalog, ResourceRecord};
use checksums::md5_hex;
use tempfile::TempDir;

/// Temporary directory removed on drop.
#[derive(Debug)]
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates an empty directory.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("respatch-test-").tempdir()?,
        })
    }

    /// Root of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `relative` inside the directory.
    #[must_use]
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Creates a subdirectory and returns its path.
    pub fn subdir(&self, relative: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = self.join(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Writes `contents` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: impl AsRef<Path>, contents: &[u8]) -> io::Result<()> {
        write_with_parents(&self.join(relative), contents)
    }

    /// Reads `relative`.
    pub fn read_file(&self, relative: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        fs::read(self.join(relative))
    }

    /// Returns `true` when `relative` exists.
    #[must_use]
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.join(relative).exists()
    }
}

/// A set of files keyed by `/`-separated relative path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileTree {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text file.
    pub fn text_file(&mut self, relative: &str, contents: &str) -> &mut Self {
        self.binary_file(relative, contents.as_bytes())
    }

    /// Adds a file with arbitrary contents.
    pub fn binary_file(&mut self, relative: &str, contents: &[u8]) -> &mut Self {
        self.files.insert(relative.to_owned(), contents.to_vec());
        self
    }

    /// Removes a file from the description.
    pub fn remove(&mut self, relative: &str) -> &mut Self {
        self.files.remove(relative);
        self
    }

    /// Files in path order.
    #[must_use]
    pub const fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    /// Contents of `relative`, if present.
    #[must_use]
    pub fn get(&self, relative: &str) -> Option<&[u8]> {
        self.files.get(relative).map(Vec::as_slice)
    }

    /// Writes every file below `root`.
    pub fn create_in(&self, root: &Path) -> io::Result<()> {
        for (relative, contents) in &self.files {
            write_with_parents(&root.join(relative), contents)?;
        }
        Ok(())
    }

    /// Reads every regular file below `root` into a tree.
    pub fn read_from(root: &Path) -> io::Result<Self> {
        let mut tree = Self::new();
        collect(root, root, &mut tree.files)?;
        Ok(tree)
    }
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect(root, &path, files)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .map_err(io::Error::other)?
                .components()
                .map(|part| part.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative, fs::read(&path)?);
        }
    }
    Ok(())
}

fn write_with_parents(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// `len` pseudo-random bytes; equal seeds give equal bytes.
#[must_use]
pub fn deterministic_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed ^ 0x9e37_79b9_7f4a_7c15;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        // xorshift64*
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        let word = state.wrapping_mul(0x2545_f491_4f6c_dd1d);
        let take = (len - out.len()).min(8);
        out.extend_from_slice(&word.to_le_bytes()[..take]);
    }
    out
}

/// Record for `contents` stored at `relative`.
#[must_use]
pub fn record_for(relative: &str, resource_type: &str, contents: &[u8]) -> ResourceRecord {
    ResourceRecord::new(relative, resource_type, md5_hex(contents), contents.len() as u64)
}

/// Catalog describing every file of `tree`.
pub fn catalog_for(tree: &FileTree, resource_type: &str) -> Catalog {
    let records = tree
        .files()
        .iter()
        .map(|(relative, contents)| record_for(relative, resource_type, contents));
    // Keys of a BTreeMap are unique, so no duplicate can be reported.
    Catalog::new(records, Vec::<String>::new()).unwrap_or_default()
}
