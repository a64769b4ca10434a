//! # powbench core
//!
//! Search and validation engine for a double SHA-256 proof-of-work.
//!
//! ## Scheme
//!
//! ```text
//! target = 2^(256 - bits)
//! digest = SHA256(SHA256(data || hex(nonce)))
//! solved  <=>  digest < target      (digest read as big-endian u256)
//! ```
//!
//! `hex(nonce)` is lowercase base-16 text without padding, so nonce `593`
//! contributes the three bytes `"251"`.
//!
//! ## Search
//!
//! A [`Solver`] runs one thread per worker. Worker `i` of `n` scans the
//! residue class `i, i + n, i + 2n, ...`, so the workers partition the nonce
//! space with no gaps and no overlap. The first worker to find a nonce claims
//! the result and stops the others; the solver joins every thread before it
//! returns.
//!
//! ## Example
//!
//! ```rust
//! use powbench_core::{ProofOfWork, Solver, validate};
//!
//! let solver = Solver::new(4).unwrap();
//! let mut pow = ProofOfWork::new(8, "test");
//!
//! let nonce = solver.solve(&mut pow).unwrap();
//! assert!(pow.is_valid());
//!
//! // Anyone can check the claim without searching again
//! assert!(validate(8, b"test", nonce));
//! ```

mod error;
mod hash;
mod params;
mod proof;
mod solver;
mod target;
mod worker;

pub use error::PowError;
pub use hash::{PowHasher, encode_nonce, leading_zero_bits, pow_hash};
pub use params::*;
pub use proof::{ProofOfWork, generate_work_data, validate};
pub use solver::{CancelToken, Solution, SolveOptions, Solver, solve};
pub use target::Target;
