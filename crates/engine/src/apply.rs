//! crates/engine/src/apply.rs
//!
//! Rebuilds the next build's resources from the previous build and a patch
//! group.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use catalog::{Catalog, PatchChunkRecord, PatchGroup, ResourceRecord};
use checksums::{ChecksumStream, md5_hex};
use delta::apply_streamed;
use logging::trace_apply;
use streams::zlib::decompress_to_vec;
use streams::{
    ByteSink, ByteSource, ByteStreamIn, ByteStreamOut, ScopedTempFile, StreamError, copy_exact,
    copy_to_end,
};

use crate::context::{PatchContext, ProgressEvent, ResourceOutcome};
use crate::options::ApplyOptions;
use crate::pool::run_jobs;
use crate::remove::remove_resources;
use crate::source::{ObjectRef, OpenedResource, ResourceSource, join_relative, reposition};
use crate::{PatchError, PatchErrorKind, PatchResult};

/// Where apply reads bytes that are not in the previous build.
#[derive(Clone, Copy)]
pub struct ApplySources<'a> {
    /// Next-build resources: brand-new files and data past the end of the
    /// previous version.
    pub next: &'a dyn ResourceSource,
    /// Stored patch payloads, addressed by chunk location.
    pub patches: &'a dyn ResourceSource,
}

impl std::fmt::Debug for ApplySources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplySources").finish_non_exhaustive()
    }
}

/// Counters describing a finished apply.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ApplySummary {
    patched: usize,
    copied: usize,
    up_to_date: usize,
    removed: usize,
    bytes_written: u64,
}

impl ApplySummary {
    /// Resources rebuilt from patch chunks.
    #[must_use]
    pub const fn patched(&self) -> usize {
        self.patched
    }

    /// Resources copied whole.
    #[must_use]
    pub const fn copied(&self) -> usize {
        self.copied
    }

    /// Resources that already had the expected content.
    #[must_use]
    pub const fn up_to_date(&self) -> usize {
        self.up_to_date
    }

    /// Removed resources that were deleted.
    #[must_use]
    pub const fn removed(&self) -> usize {
        self.removed
    }

    /// Bytes written to the destination tree.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn record(&mut self, outcome: ResourceOutcome, bytes: u64) {
        match outcome {
            ResourceOutcome::Patched => self.patched += 1,
            ResourceOutcome::Copied => self.copied += 1,
            ResourceOutcome::UpToDate => self.up_to_date += 1,
            ResourceOutcome::Removed => self.removed += 1,
            ResourceOutcome::Diffed => {}
        }
        self.bytes_written += bytes;
    }
}

/// Turns the previous build into `next`.
///
/// Every resource of `next` is written to the destination root, rebuilt from
/// the chunks `group` lists for it or copied whole, and verified against its
/// recorded checksum before it replaces the destination file. Paths the group
/// removes are deleted afterwards and emptied directories pruned.
///
/// Resources are independent: the first failure aborts the operation, and
/// resources finished before it stay written.
pub fn apply_patch_group(
    context: &PatchContext,
    options: &ApplyOptions,
    group: &PatchGroup,
    next: &Catalog,
    sources: ApplySources<'_>,
) -> PatchResult<ApplySummary> {
    let total = next.len();
    let completed = AtomicUsize::new(0);
    let job = ApplyJob {
        options,
        group,
        sources,
    };

    let outcomes = run_jobs(options.workers(), next.resources(), |record| {
        let result = job
            .apply_resource(record)
            .map_err(|error| error.context(&record.relative_path))?;
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        context.report(&ProgressEvent::Resource {
            relative_path: &record.relative_path,
            outcome: result.0,
            completed: done,
            total,
        });
        Ok(result)
    })?;

    let mut summary = ApplySummary::default();
    for (outcome, bytes) in outcomes {
        summary.record(outcome, bytes);
    }
    summary.removed = remove_resources(
        context,
        options.destination_root(),
        group.removed_resource_relative_paths(),
    )?;

    context.report(&ProgressEvent::Finished { total });
    tracing::info!(
        target: logging::targets::APPLY,
        patched = summary.patched,
        copied = summary.copied,
        up_to_date = summary.up_to_date,
        removed = summary.removed,
        bytes = summary.bytes_written,
        "patch group applied"
    );
    Ok(summary)
}

struct ApplyJob<'a> {
    options: &'a ApplyOptions,
    group: &'a PatchGroup,
    sources: ApplySources<'a>,
}

impl ApplyJob<'_> {
    fn apply_resource(&self, record: &ResourceRecord) -> PatchResult<(ResourceOutcome, u64)> {
        let chunk_size = self.options.stream_chunk_size();
        let destination = join_relative(self.options.destination_root(), &record.relative_path)?;
        if self.options.skip_up_to_date() && is_up_to_date(&destination, record, chunk_size)? {
            trace_apply!(path = %record.relative_path, "already up to date");
            return Ok((ResourceOutcome::UpToDate, 0));
        }

        let chunks = self.group.chunks_for(&record.relative_path);
        check_chunk_order(record, &chunks)?;
        let previous_path = join_relative(self.options.previous_root(), &record.relative_path)?;
        let has_previous =
            self.group.previous().get(&record.relative_path).is_some() && previous_path.is_file();
        if !chunks.is_empty() && !has_previous {
            return Err(PatchError::with_detail(
                PatchErrorKind::ResourceNotFound,
                format!("previous version '{}' is missing", previous_path.display()),
            ));
        }

        let staging_dir = self
            .options
            .temp_dir()
            .unwrap_or_else(|| self.options.destination_root());
        let temp = ScopedTempFile::new_in(staging_dir)?;
        let mut output = VerifiedOutput {
            out: ByteStreamOut::create(temp.path())?,
            checksum: ChecksumStream::new(),
        };

        let outcome = if chunks.is_empty() {
            let mut next = self.sources.next.open(resource_object(record), chunk_size)?;
            copy_to_end(&mut next, &mut output, |_| {})?;
            ResourceOutcome::Copied
        } else {
            let mut rebuild = Rebuild {
                record,
                previous: ByteStreamIn::open(&previous_path, chunk_size)?,
                next: None,
                sources: self.sources,
                chunk_size,
                max_input_chunk_size: self.group.max_input_chunk_size(),
                cursor: 0,
            };
            rebuild.run(&chunks, &mut output)?;
            ResourceOutcome::Patched
        };

        let written = output.out.finish()?;
        let actual = output.checksum.finish()?;
        if written != record.uncompressed_size {
            return Err(PatchError::with_detail(
                PatchErrorKind::ChecksumMismatch,
                format!(
                    "expected {} bytes, produced {written}",
                    record.uncompressed_size
                ),
            ));
        }
        if !actual.eq_ignore_ascii_case(&record.checksum) {
            return Err(PatchError::with_detail(
                PatchErrorKind::ChecksumMismatch,
                format!("expected {}, got {actual}", record.checksum),
            ));
        }
        drop(output);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| PatchError::io(PatchErrorKind::StreamWriteFailed, parent, error))?;
        }
        temp.persist(&destination)?;

        trace_apply!(
            path = %record.relative_path,
            chunks = chunks.len(),
            bytes = written,
            ?outcome,
            "resource written"
        );
        Ok((outcome, written))
    }
}

fn resource_object(record: &ResourceRecord) -> ObjectRef<'_> {
    ObjectRef {
        relative_path: &record.relative_path,
        location: &record.location,
    }
}

fn check_chunk_order(record: &ResourceRecord, chunks: &[&PatchChunkRecord]) -> PatchResult<()> {
    let mut end = 0u64;
    for chunk in chunks {
        if chunk.data_offset < end {
            return Err(PatchError::with_detail(
                PatchErrorKind::InvalidDocument,
                format!(
                    "chunk '{}' starts at {} before the previous chunk ends at {end}",
                    chunk.relative_path, chunk.data_offset
                ),
            ));
        }
        end = chunk.data_end();
    }
    if end > record.uncompressed_size {
        return Err(PatchError::with_detail(
            PatchErrorKind::InvalidDocument,
            format!(
                "chunks end at {end}, past the resource size {}",
                record.uncompressed_size
            ),
        ));
    }
    Ok(())
}

fn is_up_to_date(path: &Path, record: &ResourceRecord, chunk_size: usize) -> PatchResult<bool> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() && metadata.len() == record.uncompressed_size => {}
        _ => return Ok(false),
    }
    Ok(file_checksum(path, chunk_size)?.eq_ignore_ascii_case(&record.checksum))
}

/// MD5 of a file, streamed in `chunk_size` pieces.
pub fn file_checksum(path: &Path, chunk_size: usize) -> PatchResult<String> {
    let mut input = ByteStreamIn::open(path, chunk_size)?;
    let mut checksum = ChecksumStream::new();
    while let Some(chunk) = input.next_chunk()? {
        checksum.update(chunk);
    }
    Ok(checksum.finish()?)
}

/// Temp output that hashes everything written to it.
struct VerifiedOutput {
    out: ByteStreamOut,
    checksum: ChecksumStream,
}

impl ByteSink for VerifiedOutput {
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.checksum.update(data);
        ByteSink::write(&mut self.out, data)
    }

    fn bytes_written(&self) -> u64 {
        self.out.bytes_written()
    }
}

impl io::Write for VerifiedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ByteSink::write(self, buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Chunk-by-chunk reconstruction of one resource against its previous
/// version.
struct Rebuild<'a> {
    record: &'a ResourceRecord,
    previous: ByteStreamIn,
    next: Option<OpenedResource>,
    sources: ApplySources<'a>,
    chunk_size: usize,
    max_input_chunk_size: u64,
    cursor: u64,
}

impl Rebuild<'_> {
    fn run(&mut self, chunks: &[&PatchChunkRecord], out: &mut VerifiedOutput) -> PatchResult<()> {
        let previous_len = self.previous.len();
        for chunk in chunks {
            if chunk.data_offset < previous_len {
                self.fill_to(chunk.data_offset, out)?;
                match chunk.location.as_deref() {
                    None => self.copy_verbatim(chunk, out)?,
                    Some(location) => self.apply_delta(chunk, location, out)?,
                }
                self.cursor = chunk.data_end();
            } else {
                self.fill_to(chunk.data_end(), out)?;
            }
            trace_apply!(
                path = %self.record.relative_path,
                chunk = %chunk.relative_path,
                data_offset = chunk.data_offset,
                source_offset = chunk.source_offset,
                verbatim = chunk.is_verbatim(),
                "chunk applied"
            );
        }
        self.fill_to(self.record.uncompressed_size, out)
    }

    /// Identity copy up to `target`: from the previous version while inside
    /// it, from the next-build source past its end.
    fn fill_to(&mut self, target: u64, out: &mut VerifiedOutput) -> PatchResult<()> {
        let previous_len = self.previous.len();
        if self.cursor < target && self.cursor < previous_len {
            let end = target.min(previous_len);
            reposition(&mut self.previous, self.cursor)?;
            copy_exact(&mut self.previous, out, end - self.cursor, |_| {})?;
            self.cursor = end;
        }
        if self.cursor < target {
            let start = self.cursor;
            let next = self.next_stream()?;
            next.reposition(start)?;
            copy_exact(next, out, target - start, |_| {})?;
            self.cursor = target;
        }
        Ok(())
    }

    fn copy_verbatim(&mut self, chunk: &PatchChunkRecord, out: &mut VerifiedOutput) -> PatchResult<()> {
        reposition(&mut self.previous, chunk.source_offset)?;
        copy_exact(&mut self.previous, out, chunk.uncompressed_size, |_| {})?;
        Ok(())
    }

    fn apply_delta(
        &mut self,
        chunk: &PatchChunkRecord,
        location: &str,
        out: &mut VerifiedOutput,
    ) -> PatchResult<()> {
        let payload = self.sources.patches.read(ObjectRef {
            relative_path: &chunk.relative_path,
            location,
        })?;
        let digest = md5_hex(&payload);
        if !digest.eq_ignore_ascii_case(&chunk.checksum) {
            return Err(PatchError::with_detail(
                PatchErrorKind::ChecksumMismatch,
                format!(
                    "patch chunk '{}': expected {}, got {digest}",
                    chunk.relative_path, chunk.checksum
                ),
            ));
        }
        let patch = decompress_to_vec(&payload)
            .map_err(|error| PatchError::wrap(PatchErrorKind::DeltaApplyFailed, error))?;

        let previous_len = self.previous.len();
        if chunk.source_offset > previous_len {
            return Err(PatchError::with_detail(
                PatchErrorKind::DeltaApplyFailed,
                format!(
                    "source offset {} is past the previous version's {previous_len} bytes",
                    chunk.source_offset
                ),
            ));
        }
        let span = (previous_len - chunk.source_offset).min(self.max_input_chunk_size);
        reposition(&mut self.previous, chunk.source_offset)?;
        let produced = apply_streamed(&mut self.previous, span, &patch, out)?;
        if produced != chunk.uncompressed_size {
            return Err(PatchError::with_detail(
                PatchErrorKind::DeltaApplyFailed,
                format!(
                    "patch chunk '{}' produced {produced} of {} bytes",
                    chunk.relative_path, chunk.uncompressed_size
                ),
            ));
        }
        Ok(())
    }

    fn next_stream(&mut self) -> PatchResult<&mut OpenedResource> {
        let opened = match self.next.take() {
            Some(opened) => opened,
            None => self
                .sources
                .next
                .open(resource_object(self.record), self.chunk_size)?,
        };
        Ok(self.next.insert(opened))
    }
}
