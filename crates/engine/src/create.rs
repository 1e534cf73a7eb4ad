//! crates/engine/src/create.rs
//!
//! Patch creation: splits changed resources into chunks and records how each
//! chunk is rebuilt from the previous version.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use catalog::{Catalog, PatchChunkRecord, PatchEntry, PatchGroup, ResourceRecord, content_address};
use checksums::md5_hex;
use delta::{BlockMoveEncoder, create_delta_with};
use logging::trace_create;
use matching::{ChunkIndex, generate_checksum_filter};
use streams::zlib::compress_to_vec;
use streams::{ByteSink, ByteSource, ByteStreamIn, ByteStreamOut, ScopedTempFile, StreamError};
use tempfile::TempDir;

use crate::context::{PatchContext, ProgressEvent, ResourceOutcome};
use crate::options::CreateOptions;
use crate::pool::run_jobs;
use crate::source::{join_relative, reposition};
use crate::{PatchError, PatchErrorKind, PatchResult};

/// Differences between two builds, as produced by a catalog diff.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceChanges {
    /// `(previous, next)` records of resources whose content changed.
    pub changed: Vec<(ResourceRecord, ResourceRecord)>,
    /// Resources that only exist in the next build.
    pub added: Vec<ResourceRecord>,
    /// Relative paths that only exist in the previous build.
    pub removed: Vec<String>,
}

/// Build trees patch creation reads from.
#[derive(Clone, Copy, Debug)]
pub struct BuildTrees<'a> {
    /// Root of the previous build.
    pub previous: &'a Path,
    /// Root of the next build.
    pub next: &'a Path,
}

/// Writes patch payloads for every changed resource and returns the group
/// describing them.
///
/// Payloads are zlib-compressed deltas stored under the output root at their
/// content address; a payload that already exists there is reused. The group
/// embeds `previous`, lists added resources as plain entries and passes the
/// removed paths through.
pub fn create_patch_group(
    context: &PatchContext,
    options: &CreateOptions,
    previous: &Catalog,
    changes: &ResourceChanges,
    trees: BuildTrees<'_>,
) -> PatchResult<PatchGroup> {
    let total = changes.changed.len();
    let completed = AtomicUsize::new(0);
    let job = CreateJob {
        options,
        trees,
        encoder: BlockMoveEncoder::new(options.match_window())?,
    };

    let per_resource = run_jobs(options.workers(), &changes.changed, |(old, new)| {
        let chunks = job
            .diff_resource(old, new)
            .map_err(|error| error.context(&new.relative_path))?;
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        context.report(&ProgressEvent::Resource {
            relative_path: &new.relative_path,
            outcome: ResourceOutcome::Diffed,
            completed: done,
            total,
        });
        Ok(chunks)
    })?;

    let mut entries: Vec<PatchEntry> = per_resource
        .into_iter()
        .flatten()
        .map(PatchEntry::BinaryPatch)
        .collect();
    let chunk_count = entries.len();
    entries.extend(changes.added.iter().cloned().map(PatchEntry::Resource));

    context.report(&ProgressEvent::Finished { total });
    tracing::info!(
        target: logging::targets::CREATE,
        changed = total,
        chunks = chunk_count,
        added = changes.added.len(),
        removed = changes.removed.len(),
        "patch group created"
    );
    Ok(PatchGroup::new(
        options.max_input_chunk_size(),
        previous.clone(),
        entries,
        changes.removed.clone(),
    ))
}

struct CreateJob<'a> {
    options: &'a CreateOptions,
    trees: BuildTrees<'a>,
    encoder: BlockMoveEncoder,
}

impl CreateJob<'_> {
    fn diff_resource(
        &self,
        old: &ResourceRecord,
        new: &ResourceRecord,
    ) -> PatchResult<Vec<PatchChunkRecord>> {
        let previous_path = join_relative(self.trees.previous, &old.relative_path)?;
        let next_path = join_relative(self.trees.next, &new.relative_path)?;
        let chunk_len = self.options.max_input_chunk_size();

        let mut previous = ByteStreamIn::open(&previous_path, self.options.stream_chunk_size())?;
        let previous_len = previous.len();
        let mut next = ByteStreamIn::open(&next_path, chunk_size(chunk_len)?)?;
        let index = if next.len() > chunk_len && previous_len >= self.options.index_window() as u64 {
            Some(self.build_index(&previous_path, &next_path)?)
        } else {
            None
        };

        let mut records = Vec::new();
        let mut data_offset = 0u64;
        let mut chunk_number = 0usize;
        while let Some(bytes) = next.next_chunk()? {
            if data_offset >= previous_len {
                break;
            }
            let len = bytes.len() as u64;
            let at_same_offset = read_span(&mut previous, data_offset, chunk_len)?;
            if at_same_offset.starts_with(bytes) {
                trace_create!(path = %new.relative_path, data_offset, "chunk unchanged");
            } else {
                let source_offset = match &index {
                    Some(index) => index.index.find_matching_chunk(bytes)?.unwrap_or(data_offset),
                    None => data_offset,
                };
                let span = if source_offset == data_offset {
                    at_same_offset
                } else {
                    read_span(&mut previous, source_offset, chunk_len)?
                };
                let relative_path = PatchChunkRecord::object_name(&new.relative_path, chunk_number);
                let record = if span.starts_with(bytes) {
                    trace_create!(path = %new.relative_path, data_offset, source_offset, "chunk moved");
                    PatchChunkRecord {
                        relative_path,
                        resource_type: new.resource_type.clone(),
                        target_resource_relative_path: new.relative_path.clone(),
                        data_offset,
                        source_offset,
                        location: None,
                        checksum: md5_hex(bytes),
                        compressed_size: 0,
                        uncompressed_size: len,
                    }
                } else {
                    self.store_delta(new, relative_path, data_offset, source_offset, &span, bytes)?
                };
                records.push(record);
            }
            data_offset += len;
            chunk_number += 1;
        }
        Ok(records)
    }

    fn store_delta(
        &self,
        new: &ResourceRecord,
        relative_path: String,
        data_offset: u64,
        source_offset: u64,
        span: &[u8],
        bytes: &[u8],
    ) -> PatchResult<PatchChunkRecord> {
        let (patch, stats) = create_delta_with(&self.encoder, span, bytes)?;
        let payload = compress_to_vec(&patch, self.options.compression())
            .map_err(|error| PatchError::wrap(PatchErrorKind::StreamWriteFailed, error))?;
        let checksum = md5_hex(&payload);
        let location = content_address(&new.resource_type, &relative_path, &checksum);
        let stored = store_payload(self.options.output_root(), &location, &payload)?;
        trace_create!(
            path = %new.relative_path,
            data_offset,
            source_offset,
            controls = stats.controls,
            payload = payload.len(),
            stored,
            "delta chunk"
        );
        Ok(PatchChunkRecord {
            relative_path,
            resource_type: new.resource_type.clone(),
            target_resource_relative_path: new.relative_path.clone(),
            data_offset,
            source_offset,
            location: Some(location),
            checksum,
            compressed_size: payload.len() as u64,
            uncompressed_size: bytes.len() as u64,
        })
    }

    fn build_index(&self, previous: &Path, next: &Path) -> PatchResult<ScopedIndex> {
        let window = self.options.index_window();
        let dir = match self.options.temp_dir() {
            Some(parent) => tempfile::Builder::new().prefix("respatch-index-").tempdir_in(parent),
            None => tempfile::Builder::new().prefix("respatch-index-").tempdir(),
        }
        .map_err(|error| PatchError::wrap(PatchErrorKind::IndexFailed, error))?;
        let filter = generate_checksum_filter(next, window)?;
        let index = ChunkIndex::builder(window)
            .shard_capacity(self.options.shard_capacity())
            .read_chunk_size(self.options.stream_chunk_size())
            .filter(filter)
            .build(previous, dir.path())?;
        Ok(ScopedIndex { index, _dir: dir })
    }
}

/// Chunk index plus the directory holding its shards.
struct ScopedIndex {
    index: ChunkIndex,
    _dir: TempDir,
}

fn chunk_size(len: u64) -> PatchResult<usize> {
    usize::try_from(len).map_err(|_| {
        PatchError::with_detail(
            PatchErrorKind::InvalidChunkSize,
            format!("chunk size {len} does not fit in memory"),
        )
    })
}

/// Bytes `[offset, offset + max_len)` of `previous`, clipped to its end.
fn read_span(previous: &mut ByteStreamIn, offset: u64, max_len: u64) -> PatchResult<Vec<u8>> {
    let len = previous.len().saturating_sub(offset).min(max_len);
    reposition(previous, offset)?;
    Ok(previous.read(chunk_size(len)?)?)
}

/// Stores `payload` at `location` under `root` unless it is already there.
fn store_payload(root: &Path, location: &str, payload: &[u8]) -> PatchResult<bool> {
    let path: PathBuf = join_relative(root, location)?;
    if path.exists() {
        return Ok(false);
    }
    let parent = path.parent().unwrap_or(root);
    let temp = ScopedTempFile::new_in(parent)?;
    let mut out = ByteStreamOut::create(temp.path())?;
    out.write(payload)?;
    out.finish()?;
    match temp.persist_noclobber(&path) {
        Ok(()) => Ok(true),
        Err(StreamError::Persist { source, .. }) if source.kind() == io::ErrorKind::AlreadyExists => {
            Ok(false)
        }
        Err(error) => Err(error.into()),
    }
}
