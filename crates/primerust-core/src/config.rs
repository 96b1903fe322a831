//! Configuration constants and tuning parameters for the prime search.
//!
//! This module centralizes all algorithm thresholds to facilitate tuning
//! and maintain consistency across the codebase. Runtime knobs that a caller
//! may override per run live in [`SearchConfig`].

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Primality test selection thresholds for `Oracle::for_digits`.
pub mod thresholds {
    /// Largest digit count handled by the library test.
    ///
    /// Above this size the self-implemented Miller–Rabin test with random
    /// bases takes over.
    pub const LIBRARY_TEST_MAX_DIGITS: u32 = 300;
}

/// Input limits.
pub mod limits {
    /// Maximum digit count accepted by `SearchRequest::new`.
    ///
    /// A uniformly random 10^6-digit candidate already needs ~415 KB per
    /// modular product; beyond that a single test takes hours.
    pub const MAX_DIGITS: u32 = 1_000_000;
}

/// Miller–Rabin parameters.
pub mod miller_rabin {
    /// Number of random-base rounds. The error bound is $4^{-24}$ per candidate.
    pub const DEFAULT_ROUNDS: u32 = 24;

    /// Repetitions requested from GMP's `mpz_probab_prime_p` (`gmp` feature).
    pub const LIBRARY_REPS: u32 = 30;
}

/// Sieve filter parameters.
pub mod sieve {
    /// Upper bound (inclusive) of the small primes used by the default filter.
    ///
    /// 2,000 yields 303 primes and rejects roughly 85% of odd candidates.
    pub const DEFAULT_LIMIT: u32 = 2_000;
}

/// Coordinator and worker timing.
pub mod search {
    /// Interval between progress snapshots pushed to the sink.
    pub const POLL_INTERVAL_MS: u64 = 250;

    /// Upper bound on the wait for workers to acknowledge cancellation.
    pub const SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

    /// A worker publishes its local attempt count to the shared counter
    /// after this many candidates.
    pub const ATTEMPT_FLUSH_INTERVAL: u64 = 64;

    /// Repetitions used by the CLI when `--repeat` is given without a value.
    pub const DEFAULT_REPEAT: u32 = 10;
}

/// Per-run configuration of the search coordinator.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Worker count override. `None` uses every logical CPU.
    pub threads: Option<usize>,
    /// Interval between progress snapshots.
    pub poll_interval: Duration,
    /// Bound on the shutdown wait once a result is found.
    pub shutdown_timeout: Duration,
    /// Largest small prime used by the sieve filter.
    pub sieve_limit: u32,
    /// External cancellation request (e.g. Ctrl-C).
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: None,
            poll_interval: Duration::from_millis(search::POLL_INTERVAL_MS),
            shutdown_timeout: Duration::from_millis(search::SHUTDOWN_TIMEOUT_MS),
            sieve_limit: sieve::DEFAULT_LIMIT,
            interrupt: None,
        }
    }
}

impl SearchConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_sieve_limit(mut self, limit: u32) -> Self {
        self.sieve_limit = limit;
        self
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Resolves the worker count, falling back to the available parallelism.
    pub fn parallelism(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_matches_documented_crossover() {
        assert_eq!(thresholds::LIBRARY_TEST_MAX_DIGITS, 300);
    }

    #[test]
    fn miller_rabin_rounds_are_adequate() {
        assert!(miller_rabin::DEFAULT_ROUNDS >= 20);
    }

    #[test]
    fn default_config_uses_constants() {
        let config = SearchConfig::default();
        assert_eq!(config.threads, None);
        assert_eq!(config.poll_interval.as_millis() as u64, search::POLL_INTERVAL_MS);
        assert_eq!(
            config.shutdown_timeout.as_millis() as u64,
            search::SHUTDOWN_TIMEOUT_MS
        );
        assert_eq!(config.sieve_limit, sieve::DEFAULT_LIMIT);
        assert!(config.parallelism() >= 1);
    }

    #[test]
    fn thread_override_is_clamped_to_one() {
        let config = SearchConfig::default().with_threads(0);
        assert_eq!(config.parallelism(), 1);

        let config = SearchConfig::default().with_threads(3);
        assert_eq!(config.parallelism(), 3);
    }
}
