//! Uniform sampling of odd candidates with a fixed decimal digit count.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::PrimeNumber;

/// The half-open range $[10^{d-1}, 10^d)$ and a sampler over its odd members.
///
/// Odd values are drawn as $2k + 1$ with $k$ uniform in
/// $[\lfloor 10^{d-1} / 2 \rfloor, 10^d / 2)$, which covers exactly the odd
/// integers of the range, each with equal probability.
pub struct CandidateRange {
    digit_count: u32,
    lower: PrimeNumber,
    upper: PrimeNumber,
    halves: Uniform<PrimeNumber>,
}

impl CandidateRange {
    /// Builds the range for `digit_count >= 1`.
    pub fn new(digit_count: u32) -> Self {
        let digit_count = digit_count.max(1);
        let ten = PrimeNumber::from(10u8);
        let lower = ten.pow(digit_count as usize - 1);
        let upper = ten.pow(digit_count as usize);
        let halves = Uniform::new(&lower >> 1, &upper >> 1);
        Self {
            digit_count,
            lower,
            upper,
            halves,
        }
    }

    #[inline]
    pub fn digit_count(&self) -> u32 {
        self.digit_count
    }

    /// Inclusive lower bound $10^{d-1}$.
    pub fn lower(&self) -> &PrimeNumber {
        &self.lower
    }

    /// Exclusive upper bound $10^d$.
    pub fn upper(&self) -> &PrimeNumber {
        &self.upper
    }

    /// True when `n` lies in the range.
    pub fn contains(&self, n: &PrimeNumber) -> bool {
        *n >= self.lower && *n < self.upper
    }

    /// Draws a uniformly random odd candidate.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PrimeNumber {
        (self.halves.sample(rng) << 1) + PrimeNumber::from(1u8)
    }
}
