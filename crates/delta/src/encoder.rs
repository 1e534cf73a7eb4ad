//! crates/delta/src/encoder.rs
//!
//! Control-stream producers and payload serialisation.

use matching::{ChunkMatch, ChunkMatcher};

use crate::control::Control;
use crate::DeltaError;

/// Strategy that describes a target as control triples over a source.
///
/// Implementations only choose the controls; diff and literal bytes are
/// derived from the source and target when the payload is written, so every
/// strategy yields a well-formed payload.
pub trait DeltaEncoder: Send + Sync {
    /// Returns controls whose outputs sum to `target.len()`.
    fn controls(&self, source: &[u8], target: &[u8]) -> Result<Vec<Control>, DeltaError>;
}

/// Encoder built on [`ChunkMatcher`] runs.
///
/// Every run becomes an `add` of zero diff bytes, every gap between runs a
/// `copy` of literal target bytes, and seeks jump the source cursor to the
/// next run.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockMoveEncoder {
    matcher: ChunkMatcher,
}

impl BlockMoveEncoder {
    /// Creates an encoder that fingerprints `window`-byte windows.
    pub fn new(window: usize) -> Result<Self, DeltaError> {
        Ok(Self {
            matcher: ChunkMatcher::new(window)?,
        })
    }
}

impl DeltaEncoder for BlockMoveEncoder {
    fn controls(&self, source: &[u8], target: &[u8]) -> Result<Vec<Control>, DeltaError> {
        if target.is_empty() {
            return Ok(Vec::new());
        }
        let matches = self.matcher.find_matches(source, target)?;
        Ok(controls_from_matches(&matches, target.len()))
    }
}

/// Turns sorted, non-overlapping runs into control triples.
pub(crate) fn controls_from_matches(matches: &[ChunkMatch], target_len: usize) -> Vec<Control> {
    let Some(first) = matches.first() else {
        return vec![Control::new(0, target_len as u64, 0)];
    };

    let mut controls = Vec::with_capacity(matches.len() + 1);
    if first.destination_offset > 0 || first.source_offset > 0 {
        controls.push(Control::new(
            0,
            first.destination_offset as u64,
            first.source_offset as i64,
        ));
    }

    for (index, run) in matches.iter().enumerate() {
        let next = matches.get(index + 1);
        let literal_end = next.map_or(target_len, |next| next.destination_offset);
        let seek = next.map_or(0, |next| next.source_offset as i64 - run.source_end() as i64);
        controls.push(Control::new(
            run.length as u64,
            (literal_end - run.destination_end()) as u64,
            seek,
        ));
    }
    controls
}

/// Counters describing a serialised payload.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PayloadStats {
    /// Control triples written.
    pub controls: usize,
    /// Bytes produced by adding diff bytes onto the source.
    pub diff_bytes: u64,
    /// Literal bytes carried in the payload.
    pub extra_bytes: u64,
}

/// Serialises `controls` with the diff and literal bytes they imply.
pub(crate) fn write_payload(
    controls: &[Control],
    source: &[u8],
    target: &[u8],
    out: &mut Vec<u8>,
) -> Result<PayloadStats, DeltaError> {
    let mut stats = PayloadStats::default();
    let mut new_pos = 0usize;
    let mut old_pos = 0i64;

    for control in controls {
        let add = checked_len(control.add, target.len() - new_pos)?;
        let base = source_range(old_pos, add, source.len())?;
        control.encode(out)?;
        out.extend(
            target[new_pos..new_pos + add]
                .iter()
                .zip(&source[base..base + add])
                .map(|(new, old)| new.wrapping_sub(*old)),
        );
        new_pos += add;
        old_pos += add as i64;

        let copy = checked_len(control.copy, target.len() - new_pos)?;
        out.extend_from_slice(&target[new_pos..new_pos + copy]);
        new_pos += copy;
        old_pos = old_pos
            .checked_add(control.seek)
            .ok_or_else(|| DeltaError::MalformedControl {
                reason: format!("seek {} overflows the source cursor", control.seek),
            })?;

        stats.controls += 1;
        stats.diff_bytes += add as u64;
        stats.extra_bytes += copy as u64;
    }

    if new_pos != target.len() {
        return Err(DeltaError::LengthMismatch {
            expected: target.len() as u64,
            actual: new_pos as u64,
        });
    }
    Ok(stats)
}

/// Validates that `len` bytes fit in the `remaining` output.
pub(crate) fn checked_len(len: u64, remaining: usize) -> Result<usize, DeltaError> {
    match usize::try_from(len) {
        Ok(len) if len <= remaining => Ok(len),
        _ => Err(DeltaError::MalformedControl {
            reason: format!("control length {len} exceeds the {remaining} bytes left in the target"),
        }),
    }
}

/// Validates a source read of `len` bytes at `offset`, returning the start index.
pub(crate) fn source_range(offset: i64, len: usize, source_len: usize) -> Result<usize, DeltaError> {
    if len == 0 {
        return Ok(0);
    }
    let end = offset.saturating_add(len as i64);
    if offset < 0 || end as u64 > source_len as u64 {
        return Err(DeltaError::SourceOutOfRange {
            offset,
            end,
            source_len: source_len as u64,
        });
    }
    Ok(offset as usize)
}
