//! Rolling checksum used to locate candidate chunks.
//!
//! The checksum keeps two sums over a byte window: `alpha`, the plain byte
//! sum, and `beta`, the position-weighted sum where the first byte of the
//! window carries weight `len` and the last byte weight `1`. Both are reduced
//! modulo [`CHECKSUM_MODULUS`] and combined as `alpha + beta * M`, so a
//! checksum always fits in a `u32`.
//!
//! Sliding the window one byte to the right only needs the previous state,
//! the byte leaving the window and the byte entering it:
//!
//! ```text
//! alpha' = alpha - out + in
//! beta'  = beta  - len * out + alpha'
//! ```
//!
//! The rolled state is only meaningful for the window directly adjacent to
//! the previous one; rolling with bytes from anywhere else silently produces
//! a checksum for no window at all.

mod checksum;
mod error;

pub use checksum::{CHECKSUM_MODULUS, RollingChecksum};
pub use error::RollingError;
