use std::fmt::Display;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::limits;

/// Arbitrary-precision integer used for candidates and found primes.
pub type PrimeNumber = ibig::UBig;

// ============================================================================
// Errors
// ============================================================================

/// A digit count that cannot describe a search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequestError {
    #[error("digit count must be a positive integer")]
    Zero,
    #[error("digit count {digits} is too large (max supported: {max})")]
    TooLarge { digits: u32, max: u32 },
}

/// Failure inside the primality test. Always fatal to the current run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("Miller-Rabin strategy configured with zero rounds")]
    ZeroRounds,
    #[error("{digits}-digit candidates are not supported (max: {max})")]
    UnsupportedSize { digits: u32, max: u32 },
    #[error("primality backend failure: {0}")]
    Backend(String),
}

/// Failure reading or writing the persisted run history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot access history file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history file {} is not a valid record list: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode history records: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("cannot replace history file {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HistoryError {
    /// True when the persisted data exists but cannot be parsed.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, HistoryError::Corrupt { .. })
    }
}

/// Failure of a whole search run.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Invalid(#[from] InvalidRequestError),
    #[error("primality test failed: {0}")]
    Oracle(#[from] OracleError),
    #[error("cannot start search workers: {0}")]
    WorkerSpawn(String),
    #[error("search interrupted before a prime was found")]
    Interrupted,
    #[error("all workers stopped without reporting a prime")]
    NoResult,
}

// ============================================================================
// Requests and metrics
// ============================================================================

/// Immutable input to a run: the decimal digit count of the wanted prime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    digit_count: u32,
}

impl SearchRequest {
    /// Validates the digit count.
    ///
    /// # Errors
    /// * `InvalidRequestError::Zero` for `0`.
    /// * `InvalidRequestError::TooLarge` above `limits::MAX_DIGITS`.
    pub fn new(digit_count: u32) -> Result<Self, InvalidRequestError> {
        if digit_count == 0 {
            return Err(InvalidRequestError::Zero);
        }
        if digit_count > limits::MAX_DIGITS {
            return Err(InvalidRequestError::TooLarge {
                digits: digit_count,
                max: limits::MAX_DIGITS,
            });
        }
        Ok(Self { digit_count })
    }

    #[inline]
    pub fn digit_count(&self) -> u32 {
        self.digit_count
    }
}

/// Primality test actually used by a run.
///
/// Selected once from the digit count and recorded on [`RunMetrics`].
/// Records without an `algorithm` field predate the Miller–Rabin path and
/// load as `LibraryTest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// Fast library test (GMP with the `gmp` feature, Baillie–PSW otherwise).
    #[default]
    #[serde(rename = "library-test")]
    LibraryTest,
    /// Miller–Rabin with random bases, used above the library threshold.
    #[serde(rename = "miller-rabin")]
    MillerRabin,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "gmp")]
            Algorithm::LibraryTest => write!(f, "GMP probabilistic test"),
            #[cfg(not(feature = "gmp"))]
            Algorithm::LibraryTest => write!(f, "Baillie-PSW probabilistic test"),
            Algorithm::MillerRabin => write!(f, "Miller-Rabin (random bases)"),
        }
    }
}

/// Metrics of one completed search. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    #[serde(rename = "digits")]
    pub digit_count: u32,
    pub attempts: u64,
    /// Wall time from the first spawned worker until every worker has
    /// acknowledged cancellation or the shutdown timeout ran out.
    #[serde(rename = "elapsed")]
    pub elapsed_seconds: f64,
    #[serde(rename = "speed")]
    pub numbers_per_second: f64,
    #[serde(rename = "cpu", default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(rename = "prime", with = "decimal")]
    pub prime_value: PrimeNumber,
    #[serde(rename = "workers", default)]
    pub worker_count: usize,
}

impl RunMetrics {
    /// Builds metrics, deriving throughput from attempts and elapsed time.
    pub fn new(
        digit_count: u32,
        attempts: u64,
        elapsed_seconds: f64,
        cpu_percent: f64,
        algorithm: Algorithm,
        prime_value: PrimeNumber,
        worker_count: usize,
    ) -> Self {
        Self {
            digit_count,
            attempts,
            elapsed_seconds,
            numbers_per_second: throughput(attempts, elapsed_seconds),
            cpu_percent,
            algorithm,
            prime_value,
            worker_count,
        }
    }

    /// Milliseconds spent per attempt, `None` without attempts.
    pub fn ms_per_attempt(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.elapsed_seconds / self.attempts as f64 * 1000.0)
    }
}

/// Attempts per second; zero when no time has elapsed.
#[inline]
pub fn throughput(attempts: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds > 0.0 {
        attempts as f64 / elapsed_seconds
    } else {
        0.0
    }
}

/// Serializes big integers as exact decimal strings.
///
/// JSON numbers lose precision past 2^53, so the found prime is stored as
/// text and parsed back exactly.
pub(crate) mod decimal {
    use super::PrimeNumber;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &PrimeNumber, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimeNumber, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        PrimeNumber::from_str_radix(text.trim(), 10).map_err(D::Error::custom)
    }
}
