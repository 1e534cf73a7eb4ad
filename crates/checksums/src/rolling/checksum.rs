use super::error::RollingError;

/// Modulus applied to both rolling sums.
pub const CHECKSUM_MODULUS: u32 = 1 << 16;

const SUM_MASK: u32 = CHECKSUM_MODULUS - 1;

/// Sliding-window fingerprint over a fixed number of bytes.
///
/// A value of this type describes exactly one window. [`compute`](Self::compute)
/// builds the state from scratch; [`roll`](Self::roll) advances it by one byte
/// in O(1).
#[doc(alias = "rsum")]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RollingChecksum {
    alpha: u32,
    beta: u32,
    len: usize,
}

impl RollingChecksum {
    /// Computes the checksum of `window` from scratch.
    #[must_use]
    pub fn compute(window: &[u8]) -> Self {
        let mut alpha = 0u32;
        let mut beta = 0u32;
        for &byte in window {
            alpha = alpha.wrapping_add(u32::from(byte));
            beta = beta.wrapping_add(alpha);
        }

        Self {
            alpha: alpha & SUM_MASK,
            beta: beta & SUM_MASK,
            len: window.len(),
        }
    }

    /// Rebuilds a checksum from previously captured components.
    ///
    /// `alpha` and `beta` are reduced modulo [`CHECKSUM_MODULUS`].
    #[must_use]
    pub const fn from_parts(alpha: u32, beta: u32, len: usize) -> Self {
        Self {
            alpha: alpha & SUM_MASK,
            beta: beta & SUM_MASK,
            len,
        }
    }

    /// Plain byte sum of the window, modulo [`CHECKSUM_MODULUS`].
    #[inline]
    #[must_use]
    pub const fn alpha(&self) -> u32 {
        self.alpha
    }

    /// Position-weighted sum of the window, modulo [`CHECKSUM_MODULUS`].
    #[inline]
    #[must_use]
    pub const fn beta(&self) -> u32 {
        self.beta
    }

    /// Number of bytes covered by the window.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the checksum covers no bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Combined checksum `alpha + beta * M`.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.alpha | (self.beta << 16)
    }

    /// Slides the window one byte forward.
    ///
    /// `outgoing` must be the first byte of the current window and `incoming`
    /// the byte immediately after its end.
    #[inline]
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        let window_len = self.window_len_u32()?;

        let out = u32::from(outgoing);
        let inn = u32::from(incoming);

        let alpha = self.alpha.wrapping_sub(out).wrapping_add(inn) & SUM_MASK;
        let beta = self
            .beta
            .wrapping_sub(window_len.wrapping_mul(out))
            .wrapping_add(alpha)
            & SUM_MASK;

        self.alpha = alpha;
        self.beta = beta;
        Ok(())
    }

    /// Returns the state for the next window without modifying `self`.
    #[inline]
    pub fn rolled(self, outgoing: u8, incoming: u8) -> Result<Self, RollingError> {
        let mut next = self;
        next.roll(outgoing, incoming)?;
        Ok(next)
    }

    fn window_len_u32(&self) -> Result<u32, RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })
    }
}

impl From<RollingChecksum> for u32 {
    fn from(checksum: RollingChecksum) -> Self {
        checksum.value()
    }
}
