//! Search coordinator
//!
//! Splits the nonce space into `workers` residue classes (worker `i` scans
//! `i, i + workers, i + 2 * workers, ...`), runs one thread per class and
//! waits for the first nonce that meets the target. The winner raises the
//! shared cancellation flag; the coordinator raises it as well when it gives
//! up, then joins every worker before returning. Once a solve call returns no
//! thread of that search is left running.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::PowError;
use crate::hash::PowHasher;
use crate::params::{CANCEL_POLL_INTERVAL, NONCE_LIMIT};
use crate::proof::ProofOfWork;
use crate::target::Target;
use crate::worker::{RunningGuard, Worker, WorkerExit};

/// Handle for cancelling a search from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounds on a single search
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Give up with [`PowError::Timeout`] after this long
    pub timeout: Option<Duration>,
    /// Give up with [`PowError::Cancelled`] once this token fires
    pub cancel: Option<CancelToken>,
}

impl SolveOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A found nonce together with what it cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    /// Nonces hashed across all workers, including the losers
    pub attempts: u64,
    pub elapsed: Duration,
}

impl Solution {
    /// Hashes per second over the whole search
    pub fn hashrate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

/// Multi-threaded proof-of-work solver
#[derive(Debug)]
pub struct Solver {
    workers: usize,
    nonce_limit: u64,
    running: Arc<AtomicUsize>,
}

impl Solver {
    /// Create a solver running `workers` threads per search
    pub fn new(workers: usize) -> Result<Self, PowError> {
        if workers == 0 {
            return Err(PowError::InvalidWorkerCount);
        }

        Ok(Self {
            workers,
            nonce_limit: NONCE_LIMIT,
            running: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// One worker per hardware thread
    pub fn with_available_parallelism() -> Self {
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        Self {
            workers,
            nonce_limit: NONCE_LIMIT,
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_nonce_limit(mut self, limit: u64) -> Self {
        self.nonce_limit = limit;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Worker threads of this solver that are currently alive.
    ///
    /// Diagnostic only.
    pub fn running_workers(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Find a nonce for `pow`, store it in the record and return it.
    ///
    /// Blocks until a solution is found or the nonce space is exhausted.
    pub fn solve(&self, pow: &mut ProofOfWork) -> Result<u64, PowError> {
        self.solve_with(pow, &SolveOptions::default())
            .map(|solution| solution.nonce)
    }

    /// Like [`Solver::solve`], bounded by `options`
    pub fn solve_with(
        &self,
        pow: &mut ProofOfWork,
        options: &SolveOptions,
    ) -> Result<Solution, PowError> {
        if let Some(existing) = pow.proof() {
            return Err(PowError::AlreadySolved(existing));
        }

        let target = Target::from_bits(pow.bits())?;
        debug!(bits = pow.bits(), workers = self.workers, "starting search");

        let started = Instant::now();
        let mut search = self.start(pow.payload(), target)?;
        let outcome = search.wait(options);
        let attempts = search.shutdown();
        let elapsed = started.elapsed();

        // A winner may have delivered while we were giving up
        let outcome = match outcome {
            Err(e @ (PowError::Timeout(_) | PowError::Cancelled)) => {
                search.found.try_recv().map_err(|_| e)
            }
            other => other,
        };

        match outcome {
            Ok(nonce) => {
                pow.set_proof(nonce)?;
                debug!(nonce, attempts, ?elapsed, "found proof");
                Ok(Solution {
                    nonce,
                    attempts,
                    elapsed,
                })
            }
            Err(e) => {
                debug!(error = %e, attempts, ?elapsed, "search ended without a proof");
                Err(e)
            }
        }
    }

    /// Spawn one worker per residue class
    fn start(&self, payload: &[u8], target: Target) -> Result<Search, PowError> {
        let (tx, rx) = sync_channel(1);
        let hasher = Arc::new(PowHasher::new(payload));
        let stride = self.workers as u64;

        let mut search = Search {
            cancel: Arc::new(AtomicBool::new(false)),
            found: rx,
            handles: Vec::with_capacity(self.workers),
            attempts: Arc::new(AtomicU64::new(0)),
        };

        for id in 0..self.workers {
            let worker = Worker {
                id,
                start: id as u64,
                stride,
                limit: self.nonce_limit,
                hasher: Arc::clone(&hasher),
                target,
                cancel: Arc::clone(&search.cancel),
                found: tx.clone(),
                attempts: Arc::clone(&search.attempts),
            };
            let guard = RunningGuard::enter(&self.running);

            let spawned = thread::Builder::new()
                .name(format!("pow-worker-{}", id))
                .spawn(move || worker.run(guard));

            match spawned {
                Ok(handle) => search.handles.push(handle),
                Err(e) => {
                    warn!(worker = id, error = %e, "failed to spawn worker");
                    search.shutdown();
                    return Err(PowError::Spawn(e));
                }
            }
        }

        Ok(search)
    }
}

/// Free-standing `solve(bits, payload, workers)`
pub fn solve(bits: u32, payload: &str, workers: usize) -> Result<u64, PowError> {
    let mut pow = ProofOfWork::new(bits, payload);
    Solver::new(workers)?.solve(&mut pow)
}

/// Workers of one running search
struct Search {
    cancel: Arc<AtomicBool>,
    found: Receiver<u64>,
    handles: Vec<JoinHandle<WorkerExit>>,
    attempts: Arc<AtomicU64>,
}

impl Search {
    /// Wait for the first nonce. The only place the coordinator blocks.
    fn wait(&self, options: &SolveOptions) -> Result<u64, PowError> {
        // A timeout too large to represent as an instant never expires
        let deadline = options.timeout.and_then(|timeout| {
            Instant::now()
                .checked_add(timeout)
                .map(|at| (at, timeout))
        });

        loop {
            if let Some(token) = &options.cancel {
                if token.is_cancelled() {
                    return Err(PowError::Cancelled);
                }
            }

            let slice = match deadline {
                Some((at, timeout)) => {
                    let left = at.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Err(PowError::Timeout(timeout));
                    }
                    Some(match options.cancel {
                        Some(_) => left.min(CANCEL_POLL_INTERVAL),
                        None => left,
                    })
                }
                None => options.cancel.as_ref().map(|_| CANCEL_POLL_INTERVAL),
            };

            let received = match slice {
                Some(slice) => self.found.recv_timeout(slice),
                None => self.found.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(nonce) => return Ok(nonce),
                Err(RecvTimeoutError::Disconnected) => return Err(PowError::Exhausted),
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }
    }

    /// Cancel every worker and join them. Afterwards no worker can write to
    /// `found` anymore. Returns the total number of nonces hashed.
    fn shutdown(&mut self) -> u64 {
        self.cancel.store(true, Ordering::SeqCst);

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("worker panicked");
            }
        }

        self.attempts.load(Ordering::Relaxed)
    }
}

impl Drop for Search {
    // Covers unwinding out of the coordinator: workers never outlive the search
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::validate;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(Solver::new(0), Err(PowError::InvalidWorkerCount)));
        assert!(matches!(solve(8, "test", 0), Err(PowError::InvalidWorkerCount)));
    }

    #[test]
    fn test_available_parallelism_has_workers() {
        assert!(Solver::with_available_parallelism().workers() >= 1);
    }

    #[test]
    fn test_solve_stores_nonce() {
        let solver = Solver::new(4).unwrap();
        let mut pow = ProofOfWork::new(8, "test");

        let nonce = solver.solve(&mut pow).unwrap();

        assert_eq!(pow.proof(), Some(nonce));
        assert!(pow.is_valid());
    }

    #[test]
    fn test_solved_record_is_not_searched_again() {
        let solver = Solver::new(2).unwrap();
        let mut pow = ProofOfWork::with_proof(8, "test", 593);

        assert!(matches!(
            solver.solve(&mut pow),
            Err(PowError::AlreadySolved(593))
        ));
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_invalid_difficulty_spawns_nothing() {
        let solver = Solver::new(2).unwrap();

        for bits in [0, 257, 1000] {
            let mut pow = ProofOfWork::new(bits, "test");
            assert!(matches!(
                solver.solve(&mut pow),
                Err(PowError::InvalidDifficulty(b)) if b == bits
            ));
            assert!(!pow.is_solved());
        }
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_workers_are_joined_before_return() {
        let solver = Solver::new(8).unwrap();

        for bits in [1, 4, 10] {
            let mut pow = ProofOfWork::new(bits, "join");
            solver.solve(&mut pow).unwrap();
            assert_eq!(solver.running_workers(), 0);
        }
    }

    #[test]
    fn test_no_second_result_after_solve() {
        // At 1 bit nearly every worker finds something on its first hash
        let solver = Solver::new(8).unwrap();
        let mut search = solver
            .start(b"test", Target::from_bits(1).unwrap())
            .unwrap();

        let nonce = search.wait(&SolveOptions::default()).unwrap();
        search.shutdown();

        assert!(validate(1, b"test", nonce));
        assert!(search.found.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_attempts_cover_single_worker_scan() {
        let solver = Solver::new(1).unwrap();
        let mut pow = ProofOfWork::new(8, "test");

        let solution = solver.solve_with(&mut pow, &SolveOptions::default()).unwrap();

        assert_eq!(solution.nonce, 593);
        assert_eq!(solution.attempts, 594);
    }

    #[test]
    fn test_timeout() {
        let solver = Solver::new(2).unwrap();
        let mut pow = ProofOfWork::new(256, "unreachable");
        let options = SolveOptions::default().with_timeout(Duration::from_millis(50));

        let result = solver.solve_with(&mut pow, &options);

        assert!(matches!(result, Err(PowError::Timeout(t)) if t == Duration::from_millis(50)));
        assert!(!pow.is_solved());
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_unrepresentable_timeout_never_expires() {
        let solver = Solver::new(2).unwrap();
        let mut pow = ProofOfWork::new(8, "test");
        let options = SolveOptions::default().with_timeout(Duration::MAX);

        let solution = solver.solve_with(&mut pow, &options).unwrap();

        assert!(validate(8, b"test", solution.nonce));
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_dropped_search_stops_workers() {
        let solver = Solver::new(2).unwrap();
        let search = solver
            .start(b"unreachable", Target::from_bits(256).unwrap())
            .unwrap();
        assert_eq!(solver.running_workers(), 2);

        drop(search);

        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_panicking_caller_does_not_leak_workers() {
        let solver = Solver::new(2).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _search = solver
                .start(b"unreachable", Target::from_bits(256).unwrap())
                .unwrap();
            panic!("coordinator unwinds mid-search");
        }));

        assert!(result.is_err());
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_external_cancel() {
        let solver = Solver::new(2).unwrap();
        let mut pow = ProofOfWork::new(256, "unreachable");
        let token = CancelToken::new();

        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                token.cancel();
            })
        };

        let result = solver.solve_with(&mut pow, &SolveOptions::default().with_cancel(token));
        canceller.join().unwrap();

        assert!(matches!(result, Err(PowError::Cancelled)));
        assert!(!pow.is_solved());
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_cancel_before_start() {
        let solver = Solver::new(2).unwrap();
        let mut pow = ProofOfWork::new(256, "unreachable");
        let token = CancelToken::new();
        token.cancel();

        let options = SolveOptions::default()
            .with_cancel(token)
            .with_timeout(Duration::from_secs(5));

        assert!(matches!(
            solver.solve_with(&mut pow, &options),
            Err(PowError::Cancelled)
        ));
    }

    #[test]
    fn test_exhaustion_reported() {
        let solver = Solver::new(4).unwrap().with_nonce_limit(64);
        let mut pow = ProofOfWork::new(256, "unreachable");

        let result = solver.solve_with(&mut pow, &SolveOptions::default());

        assert!(matches!(result, Err(PowError::Exhausted)));
        assert!(!pow.is_solved());
        assert_eq!(solver.running_workers(), 0);
    }

    #[test]
    fn test_hashrate() {
        let solution = Solution {
            nonce: 1,
            attempts: 1000,
            elapsed: Duration::from_millis(500),
        };
        assert_eq!(solution.hashrate(), 2000.0);

        let instant = Solution {
            elapsed: Duration::ZERO,
            ..solution
        };
        assert_eq!(instant.hashrate(), 0.0);
    }
}
