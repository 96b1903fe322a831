//! # PrimeRust Core
//!
//! Parallel search for random probable primes with a given number of decimal
//! digits, plus a persistent history for benchmarking runs against each other.
//!
//! ## Pipeline
//!
//! Each worker repeatedly draws a uniform odd candidate in $[10^{d-1}, 10^d)$,
//! rejects it cheaply if a small prime divides it, and otherwise hands it to
//! the primality oracle. The first worker to find a probable prime wins and
//! every other worker is cancelled.
//!
//! ## Primality Tests
//!
//! - **Library test** ($d \le 300$): GMP's `mpz_probab_prime_p` with the `gmp`
//!   feature, Baillie–PSW on `ibig` otherwise.
//! - **Miller–Rabin** ($d > 300$): 24 rounds with uniformly random bases.
//!
//! ## Usage
//!
//! ```rust
//! use primerust_core::{
//!     run_session, HistoryPolicy, MemoryHistoryStore, NoProgress, SearchConfig,
//!     SearchCoordinator, SearchRequest,
//! };
//!
//! let coordinator = SearchCoordinator::new(SearchConfig::default());
//! let mut history = MemoryHistoryStore::new();
//! let request = SearchRequest::new(25).unwrap();
//!
//! let report = run_session(
//!     &request,
//!     &coordinator,
//!     &mut history,
//!     &NoProgress,
//!     HistoryPolicy::default(),
//! )
//! .unwrap();
//! println!("found {} after {} attempts", report.metrics.prime_value, report.metrics.attempts);
//! ```

pub mod compare;
pub mod config;
pub mod format;
pub mod history;
pub mod oracle;
pub mod search;
pub mod session;
pub mod sieve;
pub mod system;
pub mod types;

pub use types::{
    Algorithm, HistoryError, InvalidRequestError, OracleError, PrimeNumber, RunMetrics,
    SearchError, SearchRequest,
};

pub use compare::{compare, ComparisonRow, Metric, RatioSummary, Variation};
pub use config::SearchConfig;
pub use format::{format_scientific, format_time};
pub use history::{HistoryRecord, HistoryStore, JsonHistoryStore, MemoryHistoryStore};
pub use oracle::Oracle;
pub use search::{NoProgress, ProgressSink, ProgressSnapshot, SearchCoordinator};
pub use session::{run_session, HistoryPolicy, RunReport};
pub use sieve::SieveFilter;
pub use system::SystemInfo;

/// Searches for one `digits`-digit probable prime with default settings.
///
/// # Example
/// ```
/// let metrics = primerust_core::find_probable_prime(15).unwrap();
/// assert_eq!(metrics.prime_value.to_string().len(), 15);
/// ```
pub fn find_probable_prime(digits: u32) -> Result<RunMetrics, SearchError> {
    let request = SearchRequest::new(digits)?;
    SearchCoordinator::default().run_search(&request, &NoProgress)
}

/// Builds the shared sieve table ahead of the first search.
///
/// Call once at startup so the first run does not pay for the table.
pub fn prewarm_system() {
    SieveFilter::shared();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prewarm_system_idempotent() {
        prewarm_system();
        prewarm_system();
        assert_eq!(SieveFilter::shared().primes().len(), 303);
    }

    #[test]
    fn find_probable_prime_rejects_zero() {
        assert!(matches!(
            find_probable_prime(0),
            Err(SearchError::Invalid(InvalidRequestError::Zero))
        ));
    }

    #[test]
    fn find_probable_prime_small() {
        let metrics = find_probable_prime(3).unwrap();
        let value = u64::try_from(&metrics.prime_value).unwrap();
        assert!((100..1000).contains(&value));
        assert!(SieveFilter::shared().primes().contains(&value));
    }
}
