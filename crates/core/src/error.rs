//! Error type for the proof-of-work engine

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PowError {
    #[error("Difficulty must be between 1 and 256 bits, got {0}")]
    InvalidDifficulty(u32),

    #[error("At least one worker is required")]
    InvalidWorkerCount,

    #[error("Proof of work is already solved with nonce {0}")]
    AlreadySolved(u64),

    #[error("Entropy source failed: {0}")]
    Entropy(String),

    #[error("No solution found within {0:?}")]
    Timeout(Duration),

    #[error("Search was cancelled")]
    Cancelled,

    #[error("Nonce space exhausted without a solution")]
    Exhausted,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}
