//! crates/match/src/index.rs
//!
//! Sharded, checksum-sorted on-disk index over every window of one file.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use checksums::{RollingChecksum, content_hash};
use logging::trace_index;
use streams::{ByteSource, ByteStreamIn, DEFAULT_CHUNK_SIZE};

use crate::ring_buffer::RingBuffer;
use crate::{ChecksumFilter, IndexError};

/// Windows recorded per shard unless configured otherwise.
pub const DEFAULT_SHARD_CAPACITY: u64 = 1 << 20;

/// Size of one `{u32 checksum, u32 relative offset}` shard record.
pub const SHARD_RECORD_LEN: u64 = 8;

const MAX_SHARD_CAPACITY: u64 = u32::MAX as u64 + 1;

pub(crate) fn validate_window(window: usize) -> Result<(), IndexError> {
    let max = u32::MAX as usize;
    if window == 0 || window > max {
        return Err(IndexError::InvalidWindow { window, max });
    }
    Ok(())
}

/// Configures and builds a [`ChunkIndex`].
#[derive(Clone, Debug)]
pub struct ChunkIndexBuilder {
    window: usize,
    shard_capacity: u64,
    read_chunk_size: usize,
    filter: Option<ChecksumFilter>,
}

impl ChunkIndexBuilder {
    /// Source offsets covered by each shard.
    pub fn shard_capacity(mut self, capacity: u64) -> Self {
        self.shard_capacity = capacity;
        self
    }

    /// Chunk size used when streaming the indexed file.
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Only record windows whose checksum is in `filter`.
    pub fn filter(mut self, filter: ChecksumFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Indexes `source`, writing shard files into `index_dir`.
    ///
    /// Shards are named `<source file name>.<shard>.index`. Shards whose
    /// offset range produced no records are not written.
    pub fn build(
        self,
        source: impl AsRef<Path>,
        index_dir: impl AsRef<Path>,
    ) -> Result<ChunkIndex, IndexError> {
        validate_window(self.window)?;
        if self.shard_capacity == 0 || self.shard_capacity > MAX_SHARD_CAPACITY {
            return Err(IndexError::InvalidShardCapacity {
                capacity: self.shard_capacity,
            });
        }
        if let Some(filter) = &self.filter
            && filter.window() != self.window
        {
            return Err(IndexError::FilterWindowMismatch {
                filter: filter.window(),
                index: self.window,
            });
        }

        let source = source.as_ref().to_path_buf();
        let index_dir = index_dir.as_ref();
        fs::create_dir_all(index_dir).map_err(|error| IndexError::ShardWrite {
            path: index_dir.to_path_buf(),
            source: error,
        })?;
        let stem = source
            .file_name()
            .map_or_else(|| "index".to_owned(), |name| name.to_string_lossy().into_owned());

        let window_len = self.window as u64;
        let mut input = ByteStreamIn::open(&source, self.read_chunk_size)?;
        let mut ring = RingBuffer::with_capacity(self.window);
        let mut rolling: Option<RollingChecksum> = None;
        let mut consumed = 0u64;
        let mut pending: Vec<(u32, u32)> = Vec::new();
        let mut current_shard = 0u64;
        let mut shards = Vec::new();
        let mut records = 0u64;

        while let Some(chunk) = input.next_chunk()? {
            for &byte in chunk {
                let outgoing = ring.push_back(byte);
                consumed += 1;
                let state = match (outgoing, rolling) {
                    (Some(out), Some(state)) => state.rolled(out, byte)?,
                    _ if ring.is_full() => RollingChecksum::compute(ring.as_slice()),
                    _ => continue,
                };
                rolling = Some(state);
                let checksum = state.value();

                let start = consumed - window_len;
                let shard = start / self.shard_capacity;
                if shard != current_shard {
                    if !pending.is_empty() {
                        shards.push(write_shard(index_dir, &stem, current_shard, &mut pending)?);
                    }
                    current_shard = shard;
                }
                if self
                    .filter
                    .as_ref()
                    .is_some_and(|filter| !filter.contains(checksum))
                {
                    continue;
                }
                let relative = (start - shard * self.shard_capacity) as u32;
                pending.push((checksum, relative));
                records += 1;
            }
        }
        if !pending.is_empty() {
            shards.push(write_shard(index_dir, &stem, current_shard, &mut pending)?);
        }

        trace_index!(
            source = %source.display(),
            shards = shards.len(),
            records,
            "chunk index built"
        );

        Ok(ChunkIndex {
            source,
            window: self.window,
            shard_capacity: self.shard_capacity,
            shards,
            records,
        })
    }
}

/// On-disk index of every `window`-byte window of a file, keyed by rolling
/// checksum.
///
/// Shard *i* holds the windows starting in `[i × capacity, (i+1) × capacity)`,
/// sorted by checksum so lookups are binary searches over the shard file.
/// Shard files are removed when the index is dropped.
#[derive(Debug)]
pub struct ChunkIndex {
    source: PathBuf,
    window: usize,
    shard_capacity: u64,
    shards: Vec<Shard>,
    records: u64,
}

impl ChunkIndex {
    /// Starts configuring an index over `window`-byte windows.
    #[must_use]
    pub fn builder(window: usize) -> ChunkIndexBuilder {
        ChunkIndexBuilder {
            window,
            shard_capacity: DEFAULT_SHARD_CAPACITY,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            filter: None,
        }
    }

    /// Window length in bytes.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Path of the indexed file.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of shard files written.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Paths of the shard files, in shard order.
    pub fn shard_paths(&self) -> impl Iterator<Item = &Path> {
        self.shards.iter().map(|shard| shard.path.as_path())
    }

    /// Total number of recorded windows.
    #[must_use]
    pub const fn record_count(&self) -> u64 {
        self.records
    }

    /// Every source offset whose window has `checksum`, in ascending order.
    pub fn find_chunk_offsets(&self, checksum: u32) -> Result<Vec<u64>, IndexError> {
        let mut offsets = Vec::new();
        for shard in &self.shards {
            shard.collect(checksum, self.shard_capacity, &mut offsets)?;
        }
        Ok(offsets)
    }

    /// Offset of a window whose content equals the leading window of `bytes`.
    ///
    /// Candidates come from [`find_chunk_offsets`](Self::find_chunk_offsets)
    /// and are confirmed by comparing XXH3-64 content hashes. Queries shorter
    /// than the window never match.
    pub fn find_matching_chunk(&self, bytes: &[u8]) -> Result<Option<u64>, IndexError> {
        if bytes.len() < self.window {
            return Ok(None);
        }
        let query = &bytes[..self.window];
        let offsets = self.find_chunk_offsets(RollingChecksum::compute(query).value())?;
        if offsets.is_empty() {
            return Ok(None);
        }

        let expected = content_hash(query);
        let mut file = File::open(&self.source).map_err(|error| IndexError::CandidateRead {
            path: self.source.clone(),
            offset: offsets[0],
            source: error,
        })?;
        let mut candidate = vec![0u8; self.window];
        for offset in offsets {
            file.seek(SeekFrom::Start(offset))
                .and_then(|_| file.read_exact(&mut candidate))
                .map_err(|error| IndexError::CandidateRead {
                    path: self.source.clone(),
                    offset,
                    source: error,
                })?;
            if content_hash(&candidate) == expected {
                return Ok(Some(offset));
            }
        }
        Ok(None)
    }
}

#[derive(Debug)]
struct Shard {
    number: u64,
    path: PathBuf,
    records: u64,
}

impl Shard {
    fn collect(&self, checksum: u32, capacity: u64, out: &mut Vec<u64>) -> Result<(), IndexError> {
        let read_error = |source: io::Error| IndexError::ShardRead {
            path: self.path.clone(),
            source,
        };
        let mut file = File::open(&self.path).map_err(read_error)?;

        let mut lo = 0u64;
        let mut hi = self.records;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            file.seek(SeekFrom::Start(mid * SHARD_RECORD_LEN))
                .map_err(read_error)?;
            let (found, _) = read_record(&mut file).map_err(read_error)?;
            if found < checksum {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        file.seek(SeekFrom::Start(lo * SHARD_RECORD_LEN))
            .map_err(read_error)?;
        let base = self.number * capacity;
        let mut reader = BufReader::new(file);
        for _ in lo..self.records {
            let (found, relative) = read_record(&mut reader).map_err(read_error)?;
            if found != checksum {
                break;
            }
            out.push(base + u64::from(relative));
        }
        Ok(())
    }
}

impl Drop for Shard {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path)
            && error.kind() != io::ErrorKind::NotFound
        {
            trace_index!(path = %self.path.display(), %error, "failed to remove index shard");
        }
    }
}

fn read_record(reader: &mut impl Read) -> io::Result<(u32, u32)> {
    let mut buf = [0u8; SHARD_RECORD_LEN as usize];
    reader.read_exact(&mut buf)?;
    let checksum = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let relative = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    Ok((checksum, relative))
}

fn write_shard(
    dir: &Path,
    stem: &str,
    number: u64,
    pending: &mut Vec<(u32, u32)>,
) -> Result<Shard, IndexError> {
    pending.sort_unstable();
    let path = dir.join(format!("{stem}.{number}.index"));
    let file = File::create(&path).map_err(|error| IndexError::ShardWrite {
        path: path.clone(),
        source: error,
    })?;
    // Dropped on a failed write, which removes the partial file.
    let shard = Shard {
        number,
        path,
        records: pending.len() as u64,
    };

    let mut writer = BufWriter::new(file);
    let written = pending.iter().try_for_each(|&(checksum, relative)| {
        writer.write_all(&checksum.to_le_bytes())?;
        writer.write_all(&relative.to_le_bytes())
    });
    written
        .and_then(|()| writer.flush())
        .map_err(|error| IndexError::ShardWrite {
            path: shard.path.clone(),
            source: error,
        })?;

    pending.clear();
    Ok(shard)
}
