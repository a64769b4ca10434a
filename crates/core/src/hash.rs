//! Proof-of-work hash function
//!
//! ```text
//! H(payload, nonce) = SHA256(SHA256(payload || hex(nonce)))
//! ```
//!
//! `hex(nonce)` is the lowercase base-16 ASCII text of the nonce with no
//! padding and no `0x` prefix. Stored proofs depend on this exact byte
//! layout, so the search and validation paths share [`encode_nonce`].

use sha2::{Digest, Sha256};

use crate::params::{DIGEST_SIZE, MAX_NONCE_TEXT};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Reusable proof-of-work hasher bound to one payload
///
/// The payload is absorbed once; every [`PowHasher::hash`] call clones that
/// SHA-256 state and only feeds the nonce text.
#[derive(Clone)]
pub struct PowHasher {
    prefix: Sha256,
}

impl PowHasher {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            prefix: Sha256::new_with_prefix(payload),
        }
    }

    /// Compute `H(payload, nonce)`
    #[inline(always)]
    pub fn hash(&self, nonce: u64) -> [u8; DIGEST_SIZE] {
        let mut buf = [0u8; MAX_NONCE_TEXT];
        let mut first = self.prefix.clone();
        first.update(encode_nonce(nonce, &mut buf));
        Sha256::digest(first.finalize()).into()
    }
}

/// Single-shot `H(payload, nonce)`
///
/// Prefer [`PowHasher`] when hashing many nonces for the same payload.
pub fn pow_hash(payload: &[u8], nonce: u64) -> [u8; DIGEST_SIZE] {
    PowHasher::new(payload).hash(nonce)
}

/// Write the canonical text encoding of `nonce` into `buf` and return it
#[inline(always)]
pub fn encode_nonce(nonce: u64, buf: &mut [u8; MAX_NONCE_TEXT]) -> &[u8] {
    let mut pos = MAX_NONCE_TEXT;
    let mut n = nonce;
    loop {
        pos -= 1;
        buf[pos] = HEX_DIGITS[(n & 0xF) as usize];
        n >>= 4;
        if n == 0 {
            break;
        }
    }
    &buf[pos..]
}

/// Number of leading zero bits of a digest
pub fn leading_zero_bits(digest: &[u8; DIGEST_SIZE]) -> u32 {
    let mut zero_bits = 0u32;

    for byte in digest.iter() {
        if *byte == 0 {
            zero_bits += 8;
        } else {
            zero_bits += byte.leading_zeros();
            break;
        }
    }

    zero_bits
}
