//! powbench library
//!
//! Benchmark harness around the proof-of-work engine: measures how long a
//! double SHA-256 proof takes on this machine as difficulty grows.
//!
//! # Example
//!
//! ```rust
//! use powbench::bench::run_level;
//! use powbench::config::BenchConfig;
//! use powbench::engine::Solver;
//!
//! let config = BenchConfig { max_runs: 3, ..BenchConfig::default() };
//! let solver = Solver::new(2).unwrap();
//!
//! let report = run_level(&config, &solver, 4).unwrap();
//! println!("{}", report);
//! ```

// Re-export the engine
pub use powbench_core as engine;

pub mod bench;
pub mod config;

#[cfg(feature = "cli")]
pub mod cpu;

// Convenience re-exports
pub use engine::{ProofOfWork, Solver, generate_work_data, solve, validate};
