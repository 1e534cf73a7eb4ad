//! crates/delta/src/apply.rs
//!
//! Reconstruction of a target from a source and a delta.

use std::io::Write;

use logging::trace_delta;
use streams::ByteSource;

use crate::DeltaError;
use crate::container::split_header;
use crate::control::{CONTROL_LEN, Control};
use crate::encoder::{checked_len, source_range};

/// Applies `patch` to an in-memory `source` and returns the target bytes.
///
/// ```
/// let patch = delta::create_delta(b"AAAABBBBCCCC", b"AAAAXXXXCCCC")?;
/// assert_eq!(delta::apply_buffered(b"AAAABBBBCCCC", &patch)?, b"AAAAXXXXCCCC");
/// # Ok::<(), delta::DeltaError>(())
/// ```
pub fn apply_buffered(source: &[u8], patch: &[u8]) -> Result<Vec<u8>, DeltaError> {
    let (target_len, _) = split_header(patch)?;
    let capacity =
        usize::try_from(target_len).map_err(|_| DeltaError::TargetTooLarge(target_len))?;
    let mut output = Vec::with_capacity(capacity.min(patch.len().saturating_mul(8)));
    reconstruct(source, patch, |piece| {
        output.extend_from_slice(piece);
        Ok(())
    })?;
    Ok(output)
}

/// Applies `patch` to the next `source_len` bytes of `source`, writing the
/// target to `sink`. Returns the number of bytes written.
///
/// The source span is pulled in the stream's native chunk size; a stream
/// that ends before `source_len` bytes fails with an underrun.
pub fn apply_streamed<S, W>(
    source: &mut S,
    source_len: u64,
    patch: &[u8],
    sink: &mut W,
) -> Result<u64, DeltaError>
where
    S: ByteSource + ?Sized,
    W: Write + ?Sized,
{
    split_header(patch)?;
    let span = read_span(source, source_len)?;
    let written = reconstruct(&span, patch, |piece| {
        sink.write_all(piece).map_err(DeltaError::Output)
    })?;
    sink.flush().map_err(DeltaError::Output)?;
    Ok(written)
}

fn read_span<S>(source: &mut S, len: u64) -> Result<Vec<u8>, DeltaError>
where
    S: ByteSource + ?Sized,
{
    let total = usize::try_from(len).map_err(|_| DeltaError::TargetTooLarge(len))?;
    let step = source.chunk_size().max(1);
    let mut span = Vec::with_capacity(total);
    while span.len() < total {
        let piece = source.read(step.min(total - span.len()))?;
        span.extend_from_slice(&piece);
    }
    Ok(span)
}

/// Runs the control stream, handing each produced piece to `emit`.
fn reconstruct<F>(source: &[u8], patch: &[u8], mut emit: F) -> Result<u64, DeltaError>
where
    F: FnMut(&[u8]) -> Result<(), DeltaError>,
{
    let (target_len, payload) = split_header(patch)?;
    let target_len_usize =
        usize::try_from(target_len).map_err(|_| DeltaError::TargetTooLarge(target_len))?;
    let mut reader = PayloadReader::new(payload);
    let mut produced = 0usize;
    let mut old_pos = 0i64;
    let mut scratch = Vec::new();
    let mut controls = 0usize;

    while produced < target_len_usize {
        let control = reader.control()?;
        controls += 1;

        let add = checked_len(control.add, target_len_usize - produced)?;
        let base = source_range(old_pos, add, source.len())?;
        let diff = reader.take(add)?;
        scratch.clear();
        scratch.extend(
            diff.iter()
                .zip(&source[base..base + add])
                .map(|(delta, old)| delta.wrapping_add(*old)),
        );
        emit(&scratch)?;
        produced += add;
        old_pos += add as i64;

        let copy = checked_len(control.copy, target_len_usize - produced)?;
        emit(reader.take(copy)?)?;
        produced += copy;

        old_pos = old_pos
            .checked_add(control.seek)
            .ok_or_else(|| DeltaError::MalformedControl {
                reason: format!("seek {} overflows the source cursor", control.seek),
            })?;
    }

    if reader.remaining() > 0 {
        return Err(DeltaError::TrailingData(reader.remaining() as u64));
    }

    trace_delta!(
        source_len = source.len(),
        target_len,
        controls,
        "applied delta"
    );
    Ok(produced as u64)
}

struct PayloadReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DeltaError> {
        if len > self.remaining() {
            return Err(DeltaError::Truncated {
                needed: len as u64,
                available: self.remaining() as u64,
            });
        }
        let piece = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(piece)
    }

    fn control(&mut self) -> Result<Control, DeltaError> {
        let mut raw = [0u8; CONTROL_LEN];
        raw.copy_from_slice(self.take(CONTROL_LEN)?);
        Control::decode(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::HEADER_MAGIC;
    use crate::control::encode_int;
    use crate::create_delta;
    use proptest::prelude::*;
    use std::io::Write as _;
    use streams::{ByteStreamIn, StreamError};

    fn container(target_len: u64, payload: &[u8]) -> Vec<u8> {
        let mut patch = HEADER_MAGIC.to_vec();
        patch.extend_from_slice(&target_len.to_le_bytes());
        patch.extend_from_slice(payload);
        patch
    }

    fn control(add: i64, copy: i64, seek: i64) -> Vec<u8> {
        [encode_int(add), encode_int(copy), encode_int(seek)].concat()
    }

    #[test]
    fn replaced_block_round_trips() {
        let source = b"AAAABBBBCCCC";
        let target = b"AAAAXXXXCCCC";
        let patch = create_delta(source, target).expect("create");
        assert_eq!(apply_buffered(source, &patch).expect("apply"), target);
    }

    #[test]
    fn empty_source_or_target_round_trips() {
        for (source, target) in [
            (&b""[..], &b""[..]),
            (&b""[..], &b"new content"[..]),
            (&b"old content"[..], &b""[..]),
        ] {
            let patch = create_delta(source, target).expect("create");
            assert_eq!(apply_buffered(source, &patch).expect("apply"), target);
        }
    }

    #[test]
    fn handwritten_payload_adds_diff_bytes() {
        let mut payload = control(3, 2, 0);
        payload.extend_from_slice(&[1, 0, 0xFF]);
        payload.extend_from_slice(b"yz");
        let patch = container(5, &payload);
        assert_eq!(apply_buffered(b"abc", &patch).expect("apply"), b"bbbyz");
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut payload = control(0, 4, 0);
        payload.extend_from_slice(b"ab");
        let err = apply_buffered(b"", &container(4, &payload)).expect_err("truncated");
        assert!(matches!(err, DeltaError::Truncated { needed: 4, available: 2 }));

        let err = apply_buffered(b"", &container(4, &[0; 10])).expect_err("short control");
        assert!(matches!(err, DeltaError::Truncated { needed: 24, .. }));
    }

    #[test]
    fn out_of_range_seek_is_rejected() {
        let mut payload = control(0, 0, -1);
        payload.extend(control(1, 0, 0));
        payload.push(0);
        let err = apply_buffered(b"abc", &container(1, &payload)).expect_err("negative");
        assert!(matches!(err, DeltaError::SourceOutOfRange { offset: -1, .. }));
    }

    #[test]
    fn overlong_control_is_rejected() {
        let mut payload = control(0, 8, 0);
        payload.extend_from_slice(b"abcdefgh");
        let err = apply_buffered(b"", &container(4, &payload)).expect_err("overlong");
        assert!(matches!(err, DeltaError::MalformedControl { .. }));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut payload = control(0, 2, 0);
        payload.extend_from_slice(b"ab!!");
        let err = apply_buffered(b"", &container(2, &payload)).expect_err("trailing");
        assert!(matches!(err, DeltaError::TrailingData(2)));
    }

    #[test]
    fn streamed_apply_matches_buffered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("previous.bin");
        let mut prefix = vec![0xEEu8; 7];
        let source: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        prefix.extend_from_slice(&source);
        std::fs::File::create(&path)
            .and_then(|mut file| file.write_all(&prefix))
            .expect("write source");

        let mut target = source.clone();
        target[1000..1100].fill(0);
        target.extend_from_slice(b"appended tail");
        let patch = create_delta(&source, &target).expect("create");

        let mut input = ByteStreamIn::open(&path, 512).expect("open");
        input.seek(7).expect("seek");
        let mut output = Vec::new();
        let written =
            apply_streamed(&mut input, source.len() as u64, &patch, &mut output).expect("apply");
        assert_eq!(written, target.len() as u64);
        assert_eq!(output, target);
    }

    #[test]
    fn short_source_stream_underruns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("short.bin");
        std::fs::write(&path, b"abc").expect("write");
        let patch = create_delta(b"abcdef", b"abcdef").expect("create");

        let mut input = ByteStreamIn::open(&path, 2).expect("open");
        let mut output = Vec::new();
        let err = apply_streamed(&mut input, 6, &patch, &mut output).expect_err("underrun");
        assert!(err.is_underrun());
        assert!(matches!(
            err,
            DeltaError::Source(StreamError::Underrun { .. })
        ));
    }

    proptest! {
        #[test]
        fn apply_inverts_create(
            source in proptest::collection::vec(0u8..8, 0..600),
            edits in proptest::collection::vec((0usize..600, any::<u8>()), 0..12),
            tail in proptest::collection::vec(any::<u8>(), 0..40),
        ) {
            let mut target = source.clone();
            for (at, byte) in edits {
                if at < target.len() {
                    target[at] = byte;
                }
            }
            target.extend_from_slice(&tail);
            let patch = create_delta(&source, &target).expect("create");
            prop_assert_eq!(apply_buffered(&source, &patch).expect("apply"), target);
        }
    }
}
