//! Primality oracle: probabilistic tests selected once per run.
//!
//! # Strategies
//!
//! - **Library test**: GMP's `mpz_probab_prime_p` when built with the `gmp`
//!   feature, otherwise the Baillie–PSW test in [`bpsw`]. Used up to
//!   `thresholds::LIBRARY_TEST_MAX_DIGITS` digits.
//! - **Miller–Rabin (`miller_rabin`)**: random-base rounds over `ibig`
//!   modular rings, used above the threshold.

use rand::Rng;

use crate::config::{limits, miller_rabin as mr_config, thresholds};
use crate::{Algorithm, OracleError, PrimeNumber};

pub mod bpsw;
#[cfg(feature = "gmp")]
mod gmp;
pub mod miller_rabin;

/// Primality test strategy, decided from the digit count and then fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oracle {
    /// Fast library test for moderate digit counts.
    LibraryTest,
    /// Miller–Rabin with `rounds` random bases.
    MillerRabin { rounds: u32 },
}

impl Oracle {
    /// Selects the strategy for a run over `digit_count`-digit candidates.
    ///
    /// - **$d \le 300$**: `LibraryTest`.
    /// - **$d > 300$**: `MillerRabin` with `miller_rabin::DEFAULT_ROUNDS` rounds.
    ///
    /// # Errors
    /// * `OracleError::UnsupportedSize` above `limits::MAX_DIGITS`.
    ///
    /// # Example
    /// ```
    /// use primerust_core::{Algorithm, Oracle};
    ///
    /// assert_eq!(Oracle::for_digits(50).unwrap().algorithm(), Algorithm::LibraryTest);
    /// assert_eq!(Oracle::for_digits(400).unwrap().algorithm(), Algorithm::MillerRabin);
    /// ```
    pub fn for_digits(digit_count: u32) -> Result<Self, OracleError> {
        if digit_count > limits::MAX_DIGITS {
            return Err(OracleError::UnsupportedSize {
                digits: digit_count,
                max: limits::MAX_DIGITS,
            });
        }

        Ok(if digit_count <= thresholds::LIBRARY_TEST_MAX_DIGITS {
            Oracle::LibraryTest
        } else {
            Oracle::MillerRabin {
                rounds: mr_config::DEFAULT_ROUNDS,
            }
        })
    }

    /// Label recorded on the run metrics.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Oracle::LibraryTest => Algorithm::LibraryTest,
            Oracle::MillerRabin { .. } => Algorithm::MillerRabin,
        }
    }

    /// Tests `n`. `rng` supplies Miller–Rabin bases.
    ///
    /// # Errors
    /// * `OracleError::ZeroRounds` for a Miller–Rabin strategy without rounds.
    /// * `OracleError::Backend` when the GMP conversion fails.
    pub fn is_probable_prime<R: Rng + ?Sized>(
        &self,
        n: &PrimeNumber,
        rng: &mut R,
    ) -> Result<bool, OracleError> {
        if let Oracle::MillerRabin { rounds: 0 } = self {
            return Err(OracleError::ZeroRounds);
        }
        if let Some(verdict) = trivial_verdict(n) {
            return Ok(verdict);
        }

        match self {
            Oracle::LibraryTest => library_test(n),
            Oracle::MillerRabin { rounds } => Ok(miller_rabin::is_probable_prime(n, *rounds, rng)),
        }
    }
}

/// Answers for values below 5 and for even values.
fn trivial_verdict(n: &PrimeNumber) -> Option<bool> {
    match u64::try_from(n) {
        Ok(0 | 1) => Some(false),
        Ok(2 | 3) => Some(true),
        Ok(4) => Some(false),
        _ if !n.bit(0) => Some(false),
        _ => None,
    }
}

#[cfg(feature = "gmp")]
#[inline]
fn library_test(n: &PrimeNumber) -> Result<bool, OracleError> {
    gmp::is_probable_prime(n, mr_config::LIBRARY_REPS)
}

#[cfg(not(feature = "gmp"))]
#[inline]
fn library_test(n: &PrimeNumber) -> Result<bool, OracleError> {
    Ok(bpsw::is_probable_prime(n))
}
