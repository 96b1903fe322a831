//! Small-prime sieve filter.
//!
//! Rejects candidates divisible by a small prime before the expensive
//! primality test runs. The primes are packed into groups whose product fits
//! in a `u64`, so each candidate costs one big-integer remainder per group
//! (about 60 for the default limit) followed by cheap machine-word remainders.

use std::ops::Range;
use std::sync::{Arc, OnceLock};

use crate::config::sieve;
use crate::PrimeNumber;

/// Process-wide filter for `sieve::DEFAULT_LIMIT`, built on first use.
static SHARED_FILTER: OnceLock<Arc<SieveFilter>> = OnceLock::new();

/// Precomputed small-prime table. Immutable and `Send + Sync`.
#[derive(Debug, Clone)]
pub struct SieveFilter {
    primes: Vec<u64>,
    /// `(product, index range into primes)` for each packed group.
    groups: Vec<(u64, Range<usize>)>,
}

impl SieveFilter {
    /// Builds a filter from every prime `<= limit`.
    pub fn new(limit: u32) -> Self {
        let primes = small_primes(limit);
        let groups = pack_groups(&primes);
        Self { primes, groups }
    }

    /// Returns the filter for the default limit, shared across runs.
    pub fn shared() -> Arc<SieveFilter> {
        SHARED_FILTER
            .get_or_init(|| Arc::new(SieveFilter::new(sieve::DEFAULT_LIMIT)))
            .clone()
    }

    /// Returns the filter for `limit`, reusing the shared one when possible.
    pub fn for_limit(limit: u32) -> Arc<SieveFilter> {
        if limit == sieve::DEFAULT_LIMIT {
            Self::shared()
        } else {
            Arc::new(Self::new(limit))
        }
    }

    /// Primes used by the filter, ascending.
    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    /// Largest prime in the table, `None` for an empty table.
    pub fn largest_prime(&self) -> Option<u64> {
        self.primes.last().copied()
    }

    /// Returns `false` when `candidate` certainly is composite (or < 2).
    ///
    /// Candidates no larger than the largest table prime are classified
    /// exactly. Larger candidates pass unless a table prime divides them, so a
    /// pass still needs confirmation by the primality oracle.
    pub fn passes(&self, candidate: &PrimeNumber) -> bool {
        if let Some(small) = self.small_value(candidate) {
            return self.classify_small(small);
        }

        for (product, range) in &self.groups {
            let residue = residue_u64(candidate, *product);
            if self.primes[range.clone()].iter().any(|&p| residue % p == 0) {
                return false;
            }
        }
        true
    }

    /// `Some(value)` when the candidate lies within the table.
    fn small_value(&self, candidate: &PrimeNumber) -> Option<u64> {
        let largest = self.largest_prime().unwrap_or(1);
        match u64::try_from(candidate) {
            Ok(value) if value <= largest => Some(value),
            _ => None,
        }
    }

    fn classify_small(&self, value: u64) -> bool {
        if value < 2 {
            return false;
        }
        self.primes.binary_search(&value).is_ok()
    }
}

/// `candidate mod modulus` as a machine word.
#[inline]
fn residue_u64(candidate: &PrimeNumber, modulus: u64) -> u64 {
    candidate % modulus
}

/// Sieve of Eratosthenes over `[2, limit]`.
pub fn small_primes(limit: u32) -> Vec<u64> {
    let limit = limit as usize;
    if limit < 2 {
        return Vec::new();
    }

    let mut composite = vec![false; limit + 1];
    let mut primes = Vec::new();
    for n in 2..=limit {
        if composite[n] {
            continue;
        }
        primes.push(n as u64);
        let mut multiple = n * n;
        while multiple <= limit {
            composite[multiple] = true;
            multiple += n;
        }
    }
    primes
}

/// Packs consecutive primes into groups whose product stays below `u64::MAX`.
fn pack_groups(primes: &[u64]) -> Vec<(u64, Range<usize>)> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut product: u64 = 1;

    for (i, &p) in primes.iter().enumerate() {
        match product.checked_mul(p) {
            Some(next) => product = next,
            None => {
                groups.push((product, start..i));
                start = i;
                product = p;
            }
        }
    }
    if start < primes.len() {
        groups.push((product, start..primes.len()));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u64) -> PrimeNumber {
        PrimeNumber::from(n)
    }

    #[test]
    fn residue_matches_big_remainder() {
        let n = big(2).pow(127) - big(1) + big(2).pow(200) * big(977);
        for modulus in [3u64, 1_000_003, u64::MAX, 3 * 5 * 7 * 11 * 13 * 17 * 19 * 23 * 29 * 31] {
            let expected = u64::try_from(&(&n % big(modulus))).unwrap();
            assert_eq!(residue_u64(&n, modulus), expected, "modulus {modulus}");
        }
        assert_eq!(residue_u64(&big(12), 12), 0);
    }

    #[test]
    fn small_primes_known_prefix() {
        assert_eq!(small_primes(1), Vec::<u64>::new());
        assert_eq!(small_primes(2), vec![2]);
        assert_eq!(small_primes(30), vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn default_limit_prime_count() {
        // pi(2000) = 303
        assert_eq!(SieveFilter::shared().primes().len(), 303);
        assert_eq!(SieveFilter::shared().largest_prime(), Some(1999));
    }

    #[test]
    fn groups_cover_every_prime_once() {
        let filter = SieveFilter::new(5_000);
        let covered: usize = filter.groups.iter().map(|(_, r)| r.len()).sum();
        assert_eq!(covered, filter.primes().len());
        for (product, range) in &filter.groups {
            let expected = filter.primes()[range.clone()]
                .iter()
                .try_fold(1u64, |acc, &p| acc.checked_mul(p));
            assert_eq!(expected, Some(*product));
        }
    }

    #[test]
    fn single_digit_values_are_classified_exactly() {
        let filter = SieveFilter::shared();
        let passing: Vec<u64> = (0..10).filter(|&n| filter.passes(&big(n))).collect();
        assert_eq!(passing, vec![2, 3, 5, 7]);
    }

    #[test]
    fn rejects_multiples_of_small_primes() {
        let filter = SieveFilter::shared();
        assert!(!filter.passes(&big(1999 * 2003)));
        assert!(!filter.passes(&(big(10).pow(50) + big(5))));
        assert!(!filter.passes(&(big(3) * big(1_000_000_007))));
    }

    #[test]
    fn passes_primes_above_table() {
        let filter = SieveFilter::shared();
        assert!(filter.passes(&big(2003)));
        assert!(filter.passes(&big(1_000_000_007)));
        // 2^127 - 1
        assert!(filter.passes(&(big(2).pow(127) - big(1))));
    }

    #[test]
    fn passes_products_of_large_primes() {
        // False positives are allowed: both factors exceed the table.
        let filter = SieveFilter::shared();
        assert!(filter.passes(&big(2003 * 2011)));
    }

    #[test]
    fn shared_filter_is_reused() {
        let a = SieveFilter::shared();
        let b = SieveFilter::for_limit(sieve::DEFAULT_LIMIT);
        assert!(Arc::ptr_eq(&a, &b));
        let custom = SieveFilter::for_limit(100);
        assert_eq!(custom.largest_prime(), Some(97));
    }
}
