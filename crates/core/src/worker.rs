//! Search worker
//!
//! A worker owns one residue class of the nonce space: it scans
//! `start, start + stride, start + 2 * stride, ...` below the nonce limit,
//! checking the shared cancellation flag before every hash.
//!
//! The flag doubles as the claim on the result: a worker that finds a nonce
//! must flip it from `false` to `true` before sending.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::SyncSender;

use tracing::trace;

use crate::hash::PowHasher;
use crate::target::Target;

/// How a worker left the searching state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    Found(u64),
    Cancelled,
    Exhausted,
}

/// Nonces assigned to the worker starting at `start`
pub(crate) fn residue_class(start: u64, stride: u64, limit: u64) -> impl Iterator<Item = u64> {
    (start..limit).step_by(stride as usize)
}

/// Keeps the solver's running count in step with the worker thread's lifetime
pub(crate) struct RunningGuard(Arc<AtomicUsize>);

impl RunningGuard {
    pub(crate) fn enter(running: &Arc<AtomicUsize>) -> Self {
        running.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(running))
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) start: u64,
    pub(crate) stride: u64,
    pub(crate) limit: u64,
    pub(crate) hasher: Arc<PowHasher>,
    pub(crate) target: Target,
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) found: SyncSender<u64>,
    pub(crate) attempts: Arc<AtomicU64>,
}

impl Worker {
    /// Search until a nonce meets the target, the flag is raised, or the
    /// residue class runs out. Consumes the worker so its sender is dropped
    /// on exit.
    pub(crate) fn run(self, _guard: RunningGuard) -> WorkerExit {
        trace!(worker = self.id, start = self.start, stride = self.stride, "worker started");

        let mut hashed = 0u64;
        let mut exit = WorkerExit::Exhausted;

        for nonce in residue_class(self.start, self.stride, self.limit) {
            if self.cancel.load(Ordering::Relaxed) {
                exit = WorkerExit::Cancelled;
                break;
            }

            let digest = self.hasher.hash(nonce);
            hashed += 1;

            if self.target.is_met_by(&digest) {
                // Raising the flag claims the win and stops the siblings.
                // Only the claimant may deliver, so the slot is filled once.
                exit = match self
                    .cancel
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                {
                    Ok(_) => {
                        let _ = self.found.try_send(nonce);
                        WorkerExit::Found(nonce)
                    }
                    Err(_) => WorkerExit::Cancelled,
                };
                break;
            }
        }

        self.attempts.fetch_add(hashed, Ordering::Relaxed);
        trace!(worker = self.id, hashed, ?exit, "worker stopped");

        exit
    }
}
