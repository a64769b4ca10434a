//! Difficulty to target conversion
//!
//! A difficulty of `bits` leading zero bits corresponds to the threshold
//! `2^(256 - bits)`. Digests are read as unsigned big-endian integers and
//! must be strictly below the threshold.

use core::fmt;

use crate::error::PowError;
use crate::params::{DIGEST_SIZE, HASH_BITS, MAX_BITS, MIN_BITS};

/// 256-bit comparison threshold, stored big-endian
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target([u8; DIGEST_SIZE]);

impl Target {
    /// Compute `1 << (256 - bits)`.
    ///
    /// Returns [`PowError::InvalidDifficulty`] unless `1 <= bits <= 256`,
    /// since any other value has no representable threshold.
    pub fn from_bits(bits: u32) -> Result<Self, PowError> {
        if !(MIN_BITS..=MAX_BITS).contains(&bits) {
            return Err(PowError::InvalidDifficulty(bits));
        }

        let shift = (HASH_BITS - bits) as usize;
        let mut bytes = [0u8; DIGEST_SIZE];
        bytes[DIGEST_SIZE - 1 - shift / 8] = 1 << (shift % 8);

        Ok(Self(bytes))
    }

    /// True when `digest` is strictly below the threshold
    #[inline(always)]
    pub fn is_met_by(&self, digest: &[u8; DIGEST_SIZE]) -> bool {
        digest < &self.0
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", self)
    }
}
