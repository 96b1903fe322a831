//! Miller–Rabin strong probable-prime test over `ibig` modular rings.
//!
//! Writes $n - 1 = d \cdot 2^s$ with $d$ odd. A base $a$ is a witness of
//! compositeness unless $a^d \equiv 1$ or $a^{d 2^r} \equiv -1 \pmod n$ for
//! some $0 \le r < s$. Each random base lets at most 1/4 of composites through.

use ibig::modular::ModuloRing;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::PrimeNumber;

/// Precomputed $n - 1 = d \cdot 2^s$ together with the residue ring mod $n$.
pub(crate) struct StrongTest {
    ring: ModuloRing,
    n_minus_one: PrimeNumber,
    d: PrimeNumber,
    s: usize,
}

impl StrongTest {
    /// Prepares the test for an odd `n >= 5`.
    pub(crate) fn new(n: &PrimeNumber) -> Self {
        let n_minus_one = n - PrimeNumber::from(1u8);
        let s = n_minus_one.trailing_zeros().unwrap_or(0);
        let d = &n_minus_one >> s;
        Self {
            ring: ModuloRing::new(n),
            n_minus_one,
            d,
            s,
        }
    }

    /// True when `base` does not witness compositeness.
    pub(crate) fn passes_base(&self, base: &PrimeNumber) -> bool {
        let one = self.ring.from(1u8);
        let minus_one = self.ring.from(&self.n_minus_one);

        let mut x = self.ring.from(base).pow(&self.d);
        if x == one || x == minus_one {
            return true;
        }
        for _ in 1..self.s {
            x = &x * &x;
            if x == minus_one {
                return true;
            }
            if x == one {
                // Non-trivial square root of 1.
                return false;
            }
        }
        false
    }
}

/// Runs `rounds` Miller–Rabin rounds with bases drawn uniformly from $[2, n-2]$.
///
/// `n` must be odd and at least 5; callers handle smaller values.
pub fn is_probable_prime<R: Rng + ?Sized>(n: &PrimeNumber, rounds: u32, rng: &mut R) -> bool {
    let test = StrongTest::new(n);
    let low = PrimeNumber::from(2u8);
    let high = n - PrimeNumber::from(2u8);
    let bases = Uniform::new_inclusive(&low, &high);

    (0..rounds).all(|_| test.passes_base(&bases.sample(rng)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn big(n: u64) -> PrimeNumber {
        PrimeNumber::from(n)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn accepts_small_odd_primes() {
        let mut rng = rng();
        for p in [5u64, 7, 11, 13, 97, 7919, 1_000_000_007] {
            assert!(is_probable_prime(&big(p), 20, &mut rng), "{} is prime", p);
        }
    }

    #[test]
    fn rejects_small_odd_composites() {
        let mut rng = rng();
        for c in [9u64, 15, 21, 25, 1_000_000_005, 999_999_999] {
            assert!(!is_probable_prime(&big(c), 20, &mut rng), "{} is composite", c);
        }
    }

    #[test]
    fn rejects_carmichael_numbers() {
        let mut rng = rng();
        for c in [561u64, 1105, 1729, 2465, 2821, 6601, 8911, 41041, 825265] {
            assert!(!is_probable_prime(&big(c), 20, &mut rng), "{} is Carmichael", c);
        }
    }

    #[test]
    fn base_two_strong_pseudoprime_is_caught_by_other_bases() {
        // 2047 = 23 * 89 passes base 2 only.
        let test = StrongTest::new(&big(2047));
        assert!(test.passes_base(&big(2)));
        assert!(!test.passes_base(&big(3)));
        assert!(!is_probable_prime(&big(2047), 20, &mut rng()));
    }

    #[test]
    fn accepts_mersenne_prime_127() {
        let m127 = big(2).pow(127) - big(1);
        assert!(is_probable_prime(&m127, 24, &mut rng()));
    }

    #[test]
    fn rejects_product_of_two_large_primes() {
        let p = big(2).pow(61) - big(1);
        let q = big(2).pow(89) - big(1);
        assert!(!is_probable_prime(&(&p * &q), 24, &mut rng()));
    }
}
