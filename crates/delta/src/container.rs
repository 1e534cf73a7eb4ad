//! crates/delta/src/container.rs
//!
//! Container framing and delta creation.

use logging::trace_delta;

use crate::DeltaError;
use crate::encoder::{BlockMoveEncoder, DeltaEncoder, PayloadStats, write_payload};

/// Magic bytes every delta starts with.
pub const HEADER_MAGIC: &[u8; 16] = b"ENDSLEY/BSDIFF43";

/// Magic plus the 8-byte little-endian target length.
pub const HEADER_LEN: usize = HEADER_MAGIC.len() + 8;

/// Splits a delta into its declared target length and payload.
pub(crate) fn split_header(patch: &[u8]) -> Result<(u64, &[u8]), DeltaError> {
    if patch.len() < HEADER_LEN || &patch[..HEADER_MAGIC.len()] != HEADER_MAGIC {
        return Err(DeltaError::InvalidHeader);
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&patch[HEADER_MAGIC.len()..HEADER_LEN]);
    let target_len = u64::from_le_bytes(raw);
    // The top bit is a sign in the original framing; a negative length is invalid.
    if target_len >> 63 != 0 {
        return Err(DeltaError::InvalidHeader);
    }
    Ok((target_len, &patch[HEADER_LEN..]))
}

/// Length of the output `patch` reconstructs.
pub fn target_len(patch: &[u8]) -> Result<u64, DeltaError> {
    split_header(patch).map(|(len, _)| len)
}

/// Creates a delta from `source` to `target` with the default
/// [`BlockMoveEncoder`].
pub fn create_delta(source: &[u8], target: &[u8]) -> Result<Vec<u8>, DeltaError> {
    create_delta_with(&BlockMoveEncoder::default(), source, target).map(|(patch, _)| patch)
}

/// Creates a delta with `encoder`, returning the container and payload counters.
pub fn create_delta_with<E>(
    encoder: &E,
    source: &[u8],
    target: &[u8],
) -> Result<(Vec<u8>, PayloadStats), DeltaError>
where
    E: DeltaEncoder + ?Sized,
{
    let controls = encoder.controls(source, target)?;
    let mut patch = Vec::with_capacity(HEADER_LEN + target.len() / 4);
    patch.extend_from_slice(HEADER_MAGIC);
    patch.extend_from_slice(&(target.len() as u64).to_le_bytes());
    let stats = write_payload(&controls, source, target, &mut patch)?;

    trace_delta!(
        source_len = source.len(),
        target_len = target.len(),
        controls = stats.controls,
        diff_bytes = stats.diff_bytes,
        extra_bytes = stats.extra_bytes,
        "encoded delta"
    );
    Ok((patch, stats))
}
