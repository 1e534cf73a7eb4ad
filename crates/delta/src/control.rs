//! crates/delta/src/control.rs
//!
//! Control triples and their sign-magnitude integer encoding.

use crate::DeltaError;

/// Encoded size of one integer.
pub const INT_LEN: usize = 8;

/// Encoded size of one control triple.
pub const CONTROL_LEN: usize = 3 * INT_LEN;

const SIGN_BIT: u64 = 1 << 63;

/// One step of a delta: add `add` diff bytes onto the source, append `copy`
/// literal bytes, then move the source cursor by `seek`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Control {
    /// Bytes produced by adding diff bytes to source bytes.
    pub add: u64,
    /// Bytes copied verbatim from the payload.
    pub copy: u64,
    /// Relative source cursor adjustment applied after the step.
    pub seek: i64,
}

impl Control {
    /// Creates a control triple.
    #[must_use]
    pub const fn new(add: u64, copy: u64, seek: i64) -> Self {
        Self { add, copy, seek }
    }

    /// Output bytes produced by this step.
    #[must_use]
    pub const fn output_len(&self) -> u64 {
        self.add + self.copy
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<(), DeltaError> {
        out.extend_from_slice(&encode_int(to_signed(self.add)?));
        out.extend_from_slice(&encode_int(to_signed(self.copy)?));
        out.extend_from_slice(&encode_int(self.seek));
        Ok(())
    }

    pub(crate) fn decode(bytes: &[u8; CONTROL_LEN]) -> Result<Self, DeltaError> {
        let field = |index: usize| {
            let mut raw = [0u8; INT_LEN];
            raw.copy_from_slice(&bytes[index * INT_LEN..(index + 1) * INT_LEN]);
            decode_int(raw)
        };
        let add = field(0);
        let copy = field(1);
        if add < 0 || copy < 0 {
            return Err(DeltaError::MalformedControl {
                reason: format!("negative length in control ({add}, {copy})"),
            });
        }
        Ok(Self {
            add: add as u64,
            copy: copy as u64,
            seek: field(2),
        })
    }
}

fn to_signed(value: u64) -> Result<i64, DeltaError> {
    i64::try_from(value).map_err(|_| DeltaError::MalformedControl {
        reason: format!("length {value} does not fit a signed 64-bit field"),
    })
}

/// Encodes `value` as 8 little-endian bytes with the sign in the top bit.
#[must_use]
pub fn encode_int(value: i64) -> [u8; INT_LEN] {
    let raw = if value < 0 {
        value.unsigned_abs() | SIGN_BIT
    } else {
        value as u64
    };
    raw.to_le_bytes()
}

/// Decodes a sign-magnitude little-endian integer.
///
/// Negative zero decodes to zero.
#[must_use]
pub fn decode_int(bytes: [u8; INT_LEN]) -> i64 {
    let raw = u64::from_le_bytes(bytes);
    let magnitude = (raw & !SIGN_BIT) as i64;
    if raw & SIGN_BIT == 0 {
        magnitude
    } else {
        magnitude.wrapping_neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_use_sign_magnitude() {
        assert_eq!(encode_int(0), [0; 8]);
        assert_eq!(encode_int(1), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encode_int(-1), [1, 0, 0, 0, 0, 0, 0, 0x80]);
        assert_eq!(encode_int(0x0102), [2, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode_int([5, 0, 0, 0, 0, 0, 0, 0x80]), -5);
        assert_eq!(decode_int([0, 0, 0, 0, 0, 0, 0, 0x80]), 0);
    }

    #[test]
    fn extreme_values_survive() {
        for value in [i64::MAX, i64::MIN + 1, -4096, 4096] {
            assert_eq!(decode_int(encode_int(value)), value);
        }
    }

    #[test]
    fn control_layout_is_add_copy_seek() {
        let mut out = Vec::new();
        Control::new(3, 4, -2).encode(&mut out).expect("encode");
        assert_eq!(out.len(), CONTROL_LEN);
        assert_eq!(out[0], 3);
        assert_eq!(out[8], 4);
        assert_eq!(out[16], 2);
        assert_eq!(out[23], 0x80);

        let mut fixed = [0u8; CONTROL_LEN];
        fixed.copy_from_slice(&out);
        assert_eq!(Control::decode(&fixed).expect("decode"), Control::new(3, 4, -2));
    }

    #[test]
    fn negative_lengths_are_rejected() {
        let mut bytes = [0u8; CONTROL_LEN];
        bytes[..8].copy_from_slice(&encode_int(-1));
        assert!(matches!(
            Control::decode(&bytes),
            Err(DeltaError::MalformedControl { .. })
        ));
    }
}
