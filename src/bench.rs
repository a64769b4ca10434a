//! Difficulty sweep
//!
//! Solves the configured message at increasing difficulty. Each level keeps
//! solving until it has used its wall-clock budget or reached the run cap,
//! then reports how long a proof took on average.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::engine::{PowError, ProofOfWork, SolveOptions, Solver};

/// Timing for one difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelReport {
    pub bits: u32,
    /// Completed solves
    pub runs: u32,
    /// Wall-clock time spent on the level
    pub total: Duration,
    /// Nonces hashed across all runs
    pub attempts: u64,
}

impl LevelReport {
    /// Average wall-clock time per solve
    pub fn average(&self) -> Duration {
        if self.runs == 0 {
            return Duration::ZERO;
        }
        self.total / self.runs
    }

    /// Hashes per second over the level
    pub fn hashrate(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for LevelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bits: {:02}   Cnt: {:04}   Avg: {:<15} Total: {:<15} Rate: {:.0} H/s",
            self.bits,
            self.runs,
            format!("{:.3?}", self.average()),
            format!("{:.3?}", self.total),
            self.hashrate()
        )
    }
}

/// Solve the configured message at `bits` until the level budget runs out
pub fn run_level(config: &BenchConfig, solver: &Solver, bits: u32) -> Result<LevelReport, PowError> {
    let options = SolveOptions {
        timeout: config.solve_timeout(),
        cancel: None,
    };

    let start = Instant::now();
    // A budget too large to represent only ends through the run cap
    let run_until = start.checked_add(config.level_budget());
    let mut runs = 0u32;
    let mut attempts = 0u64;

    while runs < config.max_runs {
        let mut pow = ProofOfWork::new(bits, config.message.as_str());
        let solution = solver.solve_with(&mut pow, &options)?;
        runs += 1;
        attempts += solution.attempts;

        if run_until.is_some_and(|until| Instant::now() >= until) {
            break;
        }
    }

    let report = LevelReport {
        bits,
        runs,
        total: start.elapsed(),
        attempts,
    };
    debug!(bits, runs, attempts, "level finished");

    Ok(report)
}

/// Run every level from `start_bits` to `max_bits`, handing each report to
/// `on_level` as soon as it is ready.
///
/// Stops at the first failed solve, typically a timeout, with the reports
/// gathered so far already delivered. An empty range runs nothing.
pub fn run_sweep<F>(
    config: &BenchConfig,
    solver: &Solver,
    mut on_level: F,
) -> Result<Vec<LevelReport>, PowError>
where
    F: FnMut(&LevelReport),
{
    info!(
        start_bits = config.start_bits,
        max_bits = config.max_bits,
        workers = solver.workers(),
        "starting difficulty sweep"
    );

    let levels = config.start_bits..=config.max_bits;
    let mut reports = Vec::with_capacity(levels.clone().count());

    for bits in levels {
        let report = run_level(config, solver, bits)?;
        on_level(&report);
        reports.push(report);
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> BenchConfig {
        BenchConfig {
            start_bits: 1,
            max_bits: 4,
            max_runs: 5,
            level_budget_secs: 60,
            ..BenchConfig::default()
        }
    }

    #[test]
    fn test_sweep_covers_every_level() {
        let config = quick_config();
        let solver = Solver::new(2).unwrap();
        let mut seen = Vec::new();

        let reports = run_sweep(&config, &solver, |report| seen.push(report.bits)).unwrap();

        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(reports.len(), 4);
        for report in &reports {
            // Budget is generous, so the run cap ends every level
            assert_eq!(report.runs, 5);
            assert!(report.attempts >= 5);
        }
    }

    #[test]
    fn test_budget_ends_level() {
        let config = BenchConfig {
            level_budget_secs: 1,
            max_runs: u32::MAX,
            ..quick_config()
        };
        let solver = Solver::new(1).unwrap();

        // The run cap is out of reach, so only the budget can end the level
        let report = run_level(&config, &solver, 12).unwrap();

        assert!(report.runs >= 1);
        assert!(report.total >= Duration::from_secs(1));
    }

    #[test]
    fn test_huge_budget_ends_through_run_cap() {
        let config = BenchConfig {
            level_budget_secs: u64::MAX,
            max_runs: 1,
            ..quick_config()
        };
        assert!(config.validate().is_ok());
        let solver = Solver::new(1).unwrap();

        let report = run_level(&config, &solver, 1).unwrap();

        assert_eq!(report.runs, 1);
    }

    #[test]
    fn test_huge_solve_timeout_is_unbounded() {
        let config = BenchConfig {
            solve_timeout_secs: Some(u64::MAX),
            max_runs: 2,
            ..quick_config()
        };
        let solver = Solver::new(2).unwrap();

        let report = run_level(&config, &solver, 4).unwrap();

        assert_eq!(report.runs, 2);
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_inverted_range_runs_nothing() {
        let config = BenchConfig {
            start_bits: 5,
            max_bits: 4,
            ..quick_config()
        };
        let solver = Solver::new(1).unwrap();
        let mut seen = 0;

        let reports = run_sweep(&config, &solver, |_| seen += 1).unwrap();

        assert!(reports.is_empty());
        assert_eq!(seen, 0);
    }

    #[test]
    fn test_sweep_stops_on_timeout() {
        let config = BenchConfig {
            start_bits: 255,
            max_bits: 256,
            solve_timeout_secs: Some(1),
            ..quick_config()
        };
        let solver = Solver::new(1).unwrap();
        let mut seen = 0;

        let result = run_sweep(&config, &solver, |_| seen += 1);

        assert!(matches!(result, Err(PowError::Timeout(_))));
        assert_eq!(seen, 0);
    }

    #[test]
    fn test_report_math_and_format() {
        let report = LevelReport {
            bits: 7,
            runs: 4,
            total: Duration::from_secs(2),
            attempts: 1000,
        };

        assert_eq!(report.average(), Duration::from_millis(500));
        assert_eq!(report.hashrate(), 500.0);

        let line = report.to_string();
        assert!(line.starts_with("Bits: 07   Cnt: 0004   Avg: 500.000ms"));
        assert!(line.ends_with("Rate: 500 H/s"));
    }

    #[test]
    fn test_empty_report() {
        let report = LevelReport {
            bits: 1,
            runs: 0,
            total: Duration::ZERO,
            attempts: 0,
        };

        assert_eq!(report.average(), Duration::ZERO);
        assert_eq!(report.hashrate(), 0.0);
    }
}
