//! crates/match/src/matcher.rs
//!
//! In-memory longest-match search between two buffers.

use checksums::RollingChecksum;
use rustc_hash::FxHashMap;

use crate::MatchError;

/// Candidate source positions kept per checksum.
pub const DEFAULT_MAX_CANDIDATES: usize = 64;

/// Window used by [`ChunkMatcher::default`].
pub const DEFAULT_MATCH_WINDOW: usize = 16;

/// A run of bytes shared by source and destination.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ChunkMatch {
    /// Start of the run in the source buffer.
    pub source_offset: usize,
    /// Start of the run in the destination buffer.
    pub destination_offset: usize,
    /// Length of the run in bytes.
    pub length: usize,
}

impl ChunkMatch {
    /// One past the last destination byte covered by the run.
    #[must_use]
    pub const fn destination_end(&self) -> usize {
        self.destination_offset + self.length
    }

    /// One past the last source byte covered by the run.
    #[must_use]
    pub const fn source_end(&self) -> usize {
        self.source_offset + self.length
    }

    fn contains(&self, other: &Self) -> bool {
        self.destination_offset <= other.destination_offset
            && self.destination_end() >= other.destination_end()
    }
}

/// Finds maximal runs of the destination that also occur in the source.
///
/// Every source window of `window` bytes is fingerprinted with a
/// [`RollingChecksum`]. The destination is then scanned window by window;
/// on a checksum hit every candidate is verified byte for byte and extended
/// in both directions, and the longest run wins. Scanning resumes at the end
/// of the recorded run.
///
/// Returned matches are sorted by destination offset and never overlap on the
/// destination side.
///
/// ```
/// use matching::ChunkMatcher;
///
/// let matcher = ChunkMatcher::new(4)?;
/// let matches = matcher.find_matches(b"AAAABBBBCCCC", b"AAAAXXXXCCCC")?;
/// assert_eq!(matches.len(), 2);
/// assert_eq!(matches[1].destination_offset, 8);
/// # Ok::<(), matching::MatchError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ChunkMatcher {
    window: usize,
    max_candidates: usize,
}

impl Default for ChunkMatcher {
    fn default() -> Self {
        Self {
            window: DEFAULT_MATCH_WINDOW,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl ChunkMatcher {
    /// Creates a matcher for `window`-byte fingerprints.
    pub fn new(window: usize) -> Result<Self, MatchError> {
        let max = u32::MAX as usize;
        if window == 0 || window > max {
            return Err(MatchError::InvalidWindow { window, max });
        }
        Ok(Self {
            window,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        })
    }

    /// Caps the source positions remembered per checksum (minimum one).
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Window length in bytes.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Finds the matching runs between `source` and `destination`.
    pub fn find_matches(
        &self,
        source: &[u8],
        destination: &[u8],
    ) -> Result<Vec<ChunkMatch>, MatchError> {
        let window = self.window;
        if source.len() < window || destination.len() < window {
            return Ok(Vec::new());
        }

        let table = self.source_table(source)?;
        let mut matches = Vec::new();
        let mut covered = 0usize;
        let mut pos = 0usize;
        let mut rolling = RollingChecksum::compute(&destination[..window]);

        while pos + window <= destination.len() {
            let found = table
                .get(&rolling.value())
                .and_then(|candidates| {
                    self.longest_candidate(candidates, source, destination, pos, covered)
                });

            if let Some(found) = found {
                covered = found.destination_end();
                record_match(&mut matches, found);
                pos = covered;
                if pos + window <= destination.len() {
                    rolling = RollingChecksum::compute(&destination[pos..pos + window]);
                }
                continue;
            }

            if pos + window < destination.len() {
                rolling.roll(destination[pos], destination[pos + window])?;
            }
            pos += 1;
        }

        Ok(matches)
    }

    fn source_table(&self, source: &[u8]) -> Result<FxHashMap<u32, Vec<usize>>, MatchError> {
        let window = self.window;
        let mut table: FxHashMap<u32, Vec<usize>> = FxHashMap::default();
        let mut rolling = RollingChecksum::compute(&source[..window]);
        for start in 0..=source.len() - window {
            if start > 0 {
                rolling.roll(source[start - 1], source[start + window - 1])?;
            }
            let positions = table.entry(rolling.value()).or_default();
            if positions.len() < self.max_candidates {
                positions.push(start);
            }
        }
        Ok(table)
    }

    /// Verifies `candidates` against the destination window at `pos` and
    /// returns the longest extension. Backward extension stops at `floor`.
    fn longest_candidate(
        &self,
        candidates: &[usize],
        source: &[u8],
        destination: &[u8],
        pos: usize,
        floor: usize,
    ) -> Option<ChunkMatch> {
        let window = self.window;
        let target = &destination[pos..pos + window];
        let mut best: Option<ChunkMatch> = None;

        for &start in candidates {
            if &source[start..start + window] != target {
                continue;
            }
            let forward = common_prefix(&source[start + window..], &destination[pos + window..]);
            let backward = common_suffix(&source[..start], &destination[floor..pos]);
            let candidate = ChunkMatch {
                source_offset: start - backward,
                destination_offset: pos - backward,
                length: backward + window + forward,
            };
            if best.is_none_or(|current| candidate.length > current.length) {
                best = Some(candidate);
            }
        }

        best
    }
}

/// Appends `found`, discarding recorded runs it covers, dropping it when a
/// recorded run covers it, and trimming any partial overlap.
pub(crate) fn record_match(matches: &mut Vec<ChunkMatch>, mut found: ChunkMatch) {
    while matches.last().is_some_and(|last| found.contains(last)) {
        matches.pop();
    }

    if let Some(last) = matches.last() {
        if last.contains(&found) {
            return;
        }
        if found.destination_offset < last.destination_end() {
            let overlap = last.destination_end() - found.destination_offset;
            found.destination_offset += overlap;
            found.source_offset += overlap;
            found.length -= overlap;
        }
    }

    if found.length > 0 {
        matches.push(found);
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(source: &[u8], destination: &[u8], window: usize) -> Vec<ChunkMatch> {
        ChunkMatcher::new(window)
            .expect("window")
            .find_matches(source, destination)
            .expect("matches")
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(matches!(
            ChunkMatcher::new(0),
            Err(MatchError::InvalidWindow { window: 0, .. })
        ));
    }

    #[test]
    fn replaced_middle_block_leaves_two_runs() {
        let matches = run(b"AAAABBBBCCCC", b"AAAAXXXXCCCC", 4);
        assert_eq!(
            matches,
            vec![
                ChunkMatch {
                    source_offset: 0,
                    destination_offset: 0,
                    length: 4
                },
                ChunkMatch {
                    source_offset: 8,
                    destination_offset: 8,
                    length: 4
                },
            ]
        );
    }

    #[test]
    fn identical_buffers_form_one_run() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();
        let matches = run(&data, &data, 16);
        assert_eq!(
            matches,
            vec![ChunkMatch {
                source_offset: 0,
                destination_offset: 0,
                length: data.len()
            }]
        );
    }

    #[test]
    fn moved_block_is_found_at_new_offset() {
        let block: Vec<u8> = (0..64u8).collect();
        let mut source = vec![0xAAu8; 100];
        source.extend_from_slice(&block);
        let mut destination = vec![0x55u8; 10];
        destination.extend_from_slice(&block);

        let matches = run(&source, &destination, 8);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_offset, 100);
        assert_eq!(matches[0].destination_offset, 10);
        assert_eq!(matches[0].length, 64);
    }

    #[test]
    fn run_is_extended_forward_past_the_window() {
        let source = b"zzzzHELLOWORLDzzzz";
        let destination = b"qHELLOWORLDq";
        let matches = run(source, destination, 4);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].destination_offset, 1);
        assert_eq!(matches[0].source_offset, 4);
        assert_eq!(matches[0].length, 10);
    }

    #[test]
    fn short_inputs_have_no_matches() {
        assert!(run(b"abc", b"abcdef", 4).is_empty());
        assert!(run(b"abcdef", b"abc", 4).is_empty());
        assert!(run(b"", b"", 1).is_empty());
    }

    #[test]
    fn longer_recorded_run_absorbs_contained_one() {
        let mut matches = vec![ChunkMatch {
            source_offset: 0,
            destination_offset: 0,
            length: 10,
        }];
        record_match(
            &mut matches,
            ChunkMatch {
                source_offset: 3,
                destination_offset: 2,
                length: 4,
            },
        );
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].length, 10);
    }

    #[test]
    fn covering_run_replaces_recorded_ones() {
        let mut matches = vec![
            ChunkMatch {
                source_offset: 0,
                destination_offset: 4,
                length: 2,
            },
            ChunkMatch {
                source_offset: 8,
                destination_offset: 7,
                length: 2,
            },
        ];
        record_match(
            &mut matches,
            ChunkMatch {
                source_offset: 20,
                destination_offset: 3,
                length: 10,
            },
        );
        assert_eq!(
            matches,
            vec![ChunkMatch {
                source_offset: 20,
                destination_offset: 3,
                length: 10
            }]
        );
    }

    #[test]
    fn partial_overlap_is_trimmed() {
        let mut matches = vec![ChunkMatch {
            source_offset: 0,
            destination_offset: 0,
            length: 6,
        }];
        record_match(
            &mut matches,
            ChunkMatch {
                source_offset: 40,
                destination_offset: 4,
                length: 8,
            },
        );
        assert_eq!(
            matches[1],
            ChunkMatch {
                source_offset: 42,
                destination_offset: 6,
                length: 6
            }
        );
    }

    #[test]
    fn candidate_cap_bounds_repetitive_sources() {
        let source = vec![0u8; 4096];
        let destination = vec![0u8; 64];
        let matcher = ChunkMatcher::new(8).expect("window").with_max_candidates(2);
        let matches = matcher.find_matches(&source, &destination).expect("matches");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].length, 64);
    }

    proptest! {
        #[test]
        fn matches_are_verified_sorted_and_disjoint(
            source in proptest::collection::vec(0u8..4, 0..300),
            destination in proptest::collection::vec(0u8..4, 0..300),
            window in 1usize..12,
        ) {
            let matches = run(&source, &destination, window);
            let mut previous_end = 0usize;
            for found in &matches {
                prop_assert!(found.length >= window);
                prop_assert!(found.destination_offset >= previous_end);
                prop_assert_eq!(
                    &source[found.source_offset..found.source_end()],
                    &destination[found.destination_offset..found.destination_end()]
                );
                previous_end = found.destination_end();
            }
        }
    }
}
