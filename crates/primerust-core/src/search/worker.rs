//! Candidate worker: sample → sieve → oracle until cancelled.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::candidate::CandidateRange;
use crate::config::search::ATTEMPT_FLUSH_INTERVAL;
use crate::oracle::Oracle;
use crate::sieve::SieveFilter;
use crate::{OracleError, PrimeNumber};

/// A prime published by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub prime: PrimeNumber,
    pub worker_id: usize,
}

/// State shared by the coordinator and every worker of one run.
///
/// Uses lock-free atomics for the flag and counter and a single-assignment
/// cell for the result: the first `set` wins, later ones are discarded.
#[derive(Debug, Default)]
pub struct SharedState {
    cancel: AtomicBool,
    attempts: AtomicU64,
    result: OnceLock<Found>,
}

impl SharedState {
    #[inline]
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Aggregate attempts flushed so far. Exact once every worker stopped.
    #[inline]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    #[inline]
    fn add_attempts(&self, n: u64) {
        if n > 0 {
            self.attempts.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Offers a result; returns `true` if this call won the slot.
    pub fn publish(&self, found: Found) -> bool {
        self.result.set(found).is_ok()
    }

    pub fn result(&self) -> Option<&Found> {
        self.result.get()
    }
}

/// Acknowledgement sent by a worker when it exits.
#[derive(Debug)]
pub struct WorkerStopped {
    pub worker_id: usize,
    /// Candidates this worker drew.
    pub attempts: u64,
    /// Oracle failure that ended the worker, if any.
    pub error: Option<OracleError>,
}

/// One unit of parallel search.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) range: Arc<CandidateRange>,
    pub(crate) sieve: Arc<SieveFilter>,
    pub(crate) oracle: Oracle,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) events: Sender<WorkerStopped>,
}

enum Exit {
    Cancelled,
    Found(PrimeNumber),
    Failed(OracleError),
}

impl Worker {
    /// Runs until a prime is found, the oracle fails, or the run is cancelled.
    ///
    /// The cancellation flag is checked before every candidate, so shutdown
    /// latency is bounded by one sieve + oracle evaluation.
    pub(crate) fn run(self) {
        debug!(worker = self.id, "worker started");
        let mut rng = StdRng::from_entropy();
        let mut attempts: u64 = 0;
        let mut unflushed: u64 = 0;

        let exit = loop {
            if self.shared.is_cancelled() {
                break Exit::Cancelled;
            }

            let candidate = self.range.sample(&mut rng);
            attempts += 1;
            unflushed += 1;
            if unflushed >= ATTEMPT_FLUSH_INTERVAL {
                self.shared.add_attempts(unflushed);
                unflushed = 0;
            }

            if !self.sieve.passes(&candidate) {
                continue;
            }
            match self.oracle.is_probable_prime(&candidate, &mut rng) {
                Ok(true) => break Exit::Found(candidate),
                Ok(false) => {}
                Err(e) => break Exit::Failed(e),
            }
        };

        // Flush before publishing so the total is complete once acknowledged.
        self.shared.add_attempts(unflushed);

        let error = match exit {
            Exit::Cancelled => None,
            Exit::Found(prime) => {
                let won = self.shared.publish(Found {
                    prime,
                    worker_id: self.id,
                });
                debug!(worker = self.id, won, "worker found a probable prime");
                self.shared.cancel();
                None
            }
            Exit::Failed(e) => {
                self.shared.cancel();
                Some(e)
            }
        };

        debug!(worker = self.id, attempts, "worker stopped");
        // The coordinator may have given up waiting; a closed channel is fine.
        let _ = self.events.send(WorkerStopped {
            worker_id: self.id,
            attempts,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn worker(digits: u32, oracle: Oracle, shared: Arc<SharedState>) -> (Worker, crossbeam_channel::Receiver<WorkerStopped>) {
        let (tx, rx) = unbounded();
        let worker = Worker {
            id: 0,
            range: Arc::new(CandidateRange::new(digits)),
            sieve: SieveFilter::shared(),
            oracle,
            shared,
            events: tx,
        };
        (worker, rx)
    }

    #[test]
    fn first_publish_wins() {
        let shared = SharedState::default();
        assert!(shared.publish(Found {
            prime: PrimeNumber::from(7u8),
            worker_id: 1,
        }));
        assert!(!shared.publish(Found {
            prime: PrimeNumber::from(11u8),
            worker_id: 2,
        }));
        assert_eq!(shared.result().unwrap().worker_id, 1);
    }

    #[test]
    fn finds_prime_and_cancels() {
        let shared = Arc::new(SharedState::default());
        let (w, rx) = worker(12, Oracle::LibraryTest, shared.clone());
        w.run();

        let stopped = rx.recv().unwrap();
        assert!(stopped.error.is_none());
        assert!(stopped.attempts >= 1);
        assert!(shared.is_cancelled());
        assert_eq!(shared.attempts(), stopped.attempts);

        let found = shared.result().unwrap();
        assert_eq!(found.prime.to_string().len(), 12);
    }

    #[test]
    fn exits_immediately_when_cancelled() {
        let shared = Arc::new(SharedState::default());
        shared.cancel();
        let (w, rx) = worker(50, Oracle::LibraryTest, shared.clone());
        w.run();

        let stopped = rx.recv().unwrap();
        assert_eq!(stopped.attempts, 0);
        assert!(shared.result().is_none());
    }

    #[test]
    fn oracle_failure_is_reported() {
        let shared = Arc::new(SharedState::default());
        let (w, rx) = worker(30, Oracle::MillerRabin { rounds: 0 }, shared.clone());
        w.run();

        let stopped = rx.recv().unwrap();
        assert_eq!(stopped.error, Some(OracleError::ZeroRounds));
        assert!(shared.is_cancelled());
        assert!(shared.result().is_none());
    }
}
