//! Parallel candidate search.
//!
//! The [`SearchCoordinator`] owns a dedicated rayon pool with one
//! [`worker`] per slot. Workers share an `Arc<SharedState>` (cancellation
//! flag, attempt counter, single-assignment result slot) and acknowledge
//! their exit over a crossbeam channel. The coordinator waits on that channel
//! with a timeout equal to the poll interval, so each timeout doubles as a
//! progress tick.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::oracle::Oracle;
use crate::sieve::SieveFilter;
use crate::system::CpuSampler;
use crate::types::throughput;
use crate::{OracleError, RunMetrics, SearchError, SearchRequest};

pub mod candidate;
pub mod progress;
pub mod worker;

pub use candidate::CandidateRange;
pub use progress::{eta_seconds, expected_attempts, NoProgress, ProgressSink, ProgressSnapshot};
pub use worker::{Found, SharedState, WorkerStopped};

use worker::Worker;

/// Orchestrates one search at a time.
#[derive(Debug, Clone, Default)]
pub struct SearchCoordinator {
    config: SearchConfig,
}

/// Worker acknowledgements collected by the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShutdownReport {
    pub(crate) acknowledged: usize,
    /// Workers abandoned after the shutdown timeout.
    pub(crate) stragglers: usize,
}

/// Why the event loop stopped waiting.
enum Trigger {
    Stopped,
    Interrupted,
    Disconnected,
}

impl SearchCoordinator {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches for a probable prime with `request.digit_count()` digits.
    ///
    /// # Errors
    /// * `SearchError::WorkerSpawn` if the worker pool cannot be built.
    /// * `SearchError::Oracle` if any worker's primality test failed.
    /// * `SearchError::Interrupted` if the external interrupt flag was raised.
    /// * `SearchError::NoResult` if every worker vanished without a result.
    ///
    /// # Example
    /// ```
    /// use primerust_core::{NoProgress, SearchConfig, SearchCoordinator, SearchRequest};
    ///
    /// let coordinator = SearchCoordinator::new(SearchConfig::default().with_threads(2));
    /// let metrics = coordinator
    ///     .run_search(&SearchRequest::new(20).unwrap(), &NoProgress)
    ///     .unwrap();
    /// assert_eq!(metrics.prime_value.to_string().len(), 20);
    /// ```
    pub fn run_search(
        &self,
        request: &SearchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<RunMetrics, SearchError> {
        let (metrics, shutdown) = self.run_search_with_shutdown(request, sink)?;
        debug!(
            acknowledged = shutdown.acknowledged,
            stragglers = shutdown.stragglers,
            "workers shut down"
        );
        Ok(metrics)
    }

    /// Like [`run_search`](Self::run_search), also reporting how the workers
    /// answered the cancellation.
    pub(crate) fn run_search_with_shutdown(
        &self,
        request: &SearchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<(RunMetrics, ShutdownReport), SearchError> {
        let digits = request.digit_count();
        let oracle = Oracle::for_digits(digits)?;
        let parallelism = self.config.parallelism();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("prime-worker-{i}"))
            .panic_handler(|_| error!("search worker panicked"))
            .build()
            .map_err(|e| SearchError::WorkerSpawn(e.to_string()))?;

        let range = Arc::new(CandidateRange::new(digits));
        let sieve = SieveFilter::for_limit(self.config.sieve_limit);
        let shared = Arc::new(SharedState::default());
        let (tx, rx) = bounded(parallelism);

        info!(
            digits,
            workers = parallelism,
            algorithm = %oracle.algorithm(),
            "starting search"
        );
        let start = Instant::now();
        let mut cpu = CpuSampler::start();

        for id in 0..parallelism {
            let worker = Worker {
                id,
                range: range.clone(),
                sieve: sieve.clone(),
                oracle,
                shared: shared.clone(),
                events: tx.clone(),
            };
            pool.spawn(move || worker.run());
        }
        drop(tx);

        let mut stopped = Vec::with_capacity(parallelism);
        let trigger = self.wait_for_first_stop(&rx, &shared, &mut stopped, digits, start, &mut cpu, sink);

        shared.cancel();
        let stragglers = self.wait_for_shutdown(&rx, &mut stopped, parallelism);
        if stragglers > 0 {
            warn!(
                stragglers,
                timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
                "WorkerTerminationTimeout: workers did not acknowledge cancellation; abandoning them"
            );
        }

        let attempts = shared.attempts();
        let elapsed = start.elapsed().as_secs_f64();
        cpu.sample();
        // Stragglers keep their pool threads until their next flag check.
        drop(pool);

        if matches!(trigger, Trigger::Interrupted) {
            info!(digits, attempts, "search interrupted");
            return Err(SearchError::Interrupted);
        }
        if let Some(err) = first_error(&stopped) {
            return Err(SearchError::Oracle(err));
        }
        let Some(found) = shared.result().cloned() else {
            return Err(SearchError::NoResult);
        };

        let metrics = RunMetrics::new(
            digits,
            attempts,
            elapsed,
            cpu.mean(),
            oracle.algorithm(),
            found.prime,
            parallelism,
        );
        info!(
            digits,
            attempts,
            elapsed_s = elapsed,
            worker = found.worker_id,
            "probable prime found"
        );
        sink.on_found(&metrics);
        let shutdown = ShutdownReport {
            acknowledged: stopped.len(),
            stragglers,
        };
        Ok((metrics, shutdown))
    }

    /// Pushes progress snapshots until a worker stops or an interrupt arrives.
    #[allow(clippy::too_many_arguments)]
    fn wait_for_first_stop(
        &self,
        rx: &Receiver<WorkerStopped>,
        shared: &SharedState,
        stopped: &mut Vec<WorkerStopped>,
        digits: u32,
        start: Instant,
        cpu: &mut CpuSampler,
        sink: &dyn ProgressSink,
    ) -> Trigger {
        loop {
            if self.interrupt_requested() {
                return Trigger::Interrupted;
            }
            match rx.recv_timeout(self.config.poll_interval) {
                Ok(event) => {
                    stopped.push(event);
                    return Trigger::Stopped;
                }
                Err(RecvTimeoutError::Disconnected) => return Trigger::Disconnected,
                Err(RecvTimeoutError::Timeout) => {
                    let attempts = shared.attempts();
                    let elapsed_seconds = start.elapsed().as_secs_f64();
                    let numbers_per_second = throughput(attempts, elapsed_seconds);
                    sink.on_progress(&ProgressSnapshot {
                        digit_count: digits,
                        attempts,
                        elapsed_seconds,
                        numbers_per_second,
                        cpu_percent: cpu.sample(),
                        eta_seconds: eta_seconds(digits, attempts, numbers_per_second),
                    });
                }
            }
        }
    }

    /// Collects acknowledgements until every worker stopped or the timeout
    /// expires. Returns the number of workers that never answered.
    fn wait_for_shutdown(
        &self,
        rx: &Receiver<WorkerStopped>,
        stopped: &mut Vec<WorkerStopped>,
        parallelism: usize,
    ) -> usize {
        let deadline = Instant::now() + self.config.shutdown_timeout;
        while stopped.len() < parallelism {
            match rx.recv_deadline(deadline) {
                Ok(event) => stopped.push(event),
                Err(_) => break,
            }
        }
        parallelism - stopped.len()
    }

    fn interrupt_requested(&self) -> bool {
        self.config
            .interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

fn first_error(stopped: &[WorkerStopped]) -> Option<OracleError> {
    stopped.iter().find_map(|s| s.error.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Algorithm;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use std::time::Duration;

    fn coordinator(threads: usize) -> SearchCoordinator {
        SearchCoordinator::new(
            SearchConfig::default()
                .with_threads(threads)
                .with_poll_interval(Duration::from_millis(20)),
        )
    }

    #[derive(Default)]
    struct Recorder {
        snapshots: Mutex<Vec<ProgressSnapshot>>,
        found: Mutex<Vec<RunMetrics>>,
    }

    impl ProgressSink for Recorder {
        fn on_progress(&self, snapshot: &ProgressSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot.clone());
        }

        fn on_found(&self, metrics: &RunMetrics) {
            self.found.lock().unwrap().push(metrics.clone());
        }
    }

    #[test]
    fn single_digit_search_finds_small_prime() {
        let metrics = coordinator(2)
            .run_search(&SearchRequest::new(1).unwrap(), &NoProgress)
            .unwrap();
        let value = u64::try_from(&metrics.prime_value).unwrap();
        assert!([2, 3, 5, 7].contains(&value), "found {}", value);
        assert!(metrics.attempts >= 1);
        assert_eq!(metrics.algorithm, Algorithm::LibraryTest);
    }

    #[test]
    fn fifty_digit_search_uses_library_test() {
        let metrics = coordinator(2)
            .run_search(&SearchRequest::new(50).unwrap(), &NoProgress)
            .unwrap();
        assert_eq!(metrics.algorithm, Algorithm::LibraryTest);
        assert_eq!(metrics.prime_value.to_string().len(), 50);
        assert!(metrics.prime_value.bit(0));
        assert_eq!(metrics.worker_count, 2);
    }

    #[test]
    fn four_hundred_digit_search_uses_miller_rabin() {
        let metrics = coordinator(4)
            .run_search(&SearchRequest::new(400).unwrap(), &NoProgress)
            .unwrap();
        assert_eq!(metrics.algorithm, Algorithm::MillerRabin);
        assert_eq!(metrics.prime_value.to_string().len(), 400);
    }

    #[test]
    fn metrics_are_consistent() {
        let metrics = coordinator(2)
            .run_search(&SearchRequest::new(30).unwrap(), &NoProgress)
            .unwrap();
        assert!(metrics.elapsed_seconds > 0.0);
        let expected_speed = metrics.attempts as f64 / metrics.elapsed_seconds;
        assert!((metrics.numbers_per_second - expected_speed).abs() < 1e-6);
        assert!((0.0..=100.0).contains(&metrics.cpu_percent));
    }

    #[test]
    fn sink_receives_exactly_one_found_event() {
        let recorder = Recorder::default();
        let metrics = coordinator(3)
            .run_search(&SearchRequest::new(200).unwrap(), &recorder)
            .unwrap();
        let found = recorder.found.lock().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], metrics);

        for snapshot in recorder.snapshots.lock().unwrap().iter() {
            assert_eq!(snapshot.digit_count, 200);
            assert!(snapshot.attempts <= metrics.attempts);
        }
    }

    #[test]
    fn interrupt_stops_without_result() {
        let flag = Arc::new(AtomicBool::new(true));
        let coordinator = SearchCoordinator::new(
            SearchConfig::default()
                .with_threads(2)
                .with_interrupt(flag),
        );
        let err = coordinator
            .run_search(&SearchRequest::new(500).unwrap(), &NoProgress)
            .unwrap_err();
        assert!(matches!(err, SearchError::Interrupted));
    }

    #[test]
    fn every_worker_acknowledges_with_default_timeout() {
        let (metrics, shutdown) = SearchCoordinator::new(SearchConfig::default().with_threads(4))
            .run_search_with_shutdown(&SearchRequest::new(60).unwrap(), &NoProgress)
            .unwrap();
        assert_eq!(metrics.worker_count, 4);
        assert_eq!(shutdown, ShutdownReport { acknowledged: 4, stragglers: 0 });
    }

    #[test]
    fn zero_shutdown_timeout_abandons_stragglers_but_succeeds() {
        let coordinator = SearchCoordinator::new(
            SearchConfig::default()
                .with_threads(4)
                .with_shutdown_timeout(Duration::ZERO),
        );
        let (metrics, shutdown) = coordinator
            .run_search_with_shutdown(&SearchRequest::new(700).unwrap(), &NoProgress)
            .unwrap();
        assert_eq!(metrics.algorithm, Algorithm::MillerRabin);
        assert_eq!(metrics.prime_value.to_string().len(), 700);
        assert!(shutdown.acknowledged >= 1);
        assert_eq!(shutdown.acknowledged + shutdown.stragglers, 4);
    }

    #[test]
    fn elapsed_covers_shutdown_wait_within_call() {
        let start = Instant::now();
        let metrics = coordinator(2)
            .run_search(&SearchRequest::new(40).unwrap(), &NoProgress)
            .unwrap();
        let outer = start.elapsed().as_secs_f64();
        assert!(metrics.elapsed_seconds > 0.0);
        assert!(metrics.elapsed_seconds <= outer);
    }

    #[test]
    fn shutdown_completes_within_timeout() {
        let timeout = Duration::from_secs(5);
        let coordinator = SearchCoordinator::new(
            SearchConfig::default()
                .with_threads(4)
                .with_shutdown_timeout(timeout),
        );
        let start = Instant::now();
        coordinator
            .run_search(&SearchRequest::new(60).unwrap(), &NoProgress)
            .unwrap();
        // A 60-digit search plus shutdown finishes far below the bound.
        assert!(start.elapsed() < timeout * 2);
    }
}
