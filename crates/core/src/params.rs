//! Engine parameters
//!
//! Fixed values shared by the search and validation paths.

use std::time::Duration;

/// Width of the comparison space in bits
pub const HASH_BITS: u32 = 256;

/// Size of a digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// Smallest accepted difficulty
pub const MIN_BITS: u32 = 1;

/// Largest accepted difficulty
pub const MAX_BITS: u32 = HASH_BITS;

/// Exclusive upper bound of the nonce space scanned by workers.
///
/// Kept at the largest positive 63-bit value so nonces survive signed
/// 64-bit round trips in other tooling.
pub const NONCE_LIMIT: u64 = i64::MAX as u64;

/// Longest text encoding of a nonce (`u64::MAX` in hex)
pub const MAX_NONCE_TEXT: usize = 16;

/// Size of freshly generated work data before base64 encoding
pub const WORK_DATA_SIZE: usize = 32;

/// How often the coordinator re-checks an external cancel token while waiting
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);
