//! Baillie–PSW probable-prime test.
//!
//! A strong base-2 Miller–Rabin test followed by a strong Lucas test with
//! Selfridge's parameters (method A): the first $D$ in $5, -7, 9, -11, \dots$
//! with Jacobi symbol $(D/n) = -1$, then $P = 1$, $Q = (1 - D)/4$.
//! No composite passing both halves is known.
//!
//! This is the library test used when the crate is built without GMP.

use ibig::modular::ModuloRing;

use super::miller_rabin::StrongTest;
use crate::PrimeNumber;

/// Primes below 100, used for trial division ahead of the Lucas step.
const TRIAL_PRIMES: [u64; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97,
];

/// Selfridge candidates tried before checking for a perfect square.
const SQUARE_CHECK_AFTER: usize = 8;

/// Baillie–PSW test. Deterministic.
pub fn is_probable_prime(n: &PrimeNumber) -> bool {
    if let Some(verdict) = trial_division(n) {
        return verdict;
    }
    if !StrongTest::new(n).passes_base(&PrimeNumber::from(2u8)) {
        return false;
    }
    strong_lucas(n)
}

/// Settles values up to 100^2 and anything with a factor below 100.
fn trial_division(n: &PrimeNumber) -> Option<bool> {
    let small = u64::try_from(n).ok();
    if let Some(value) = small {
        if value < 2 {
            return Some(false);
        }
    }
    for &p in &TRIAL_PRIMES {
        if small == Some(p) {
            return Some(true);
        }
        if small_residue(n, p) == 0 {
            return Some(false);
        }
    }
    match small {
        Some(value) if value < 100 * 100 => Some(true),
        _ => None,
    }
}

/// Strong Lucas probable-prime test for odd `n` with no factor below 100.
fn strong_lucas(n: &PrimeNumber) -> bool {
    let Some(d) = selfridge_d(n) else {
        return false;
    };
    let q = (1 - d) / 4;

    let ring = ModuloRing::new(n);
    let zero = ring.from(0u8);
    let p_mod = ring.from(1u8);
    let d_mod = ring.from(d);
    let q_mod = ring.from(q);
    // 2 * (n + 1) / 2 = n + 1 = 1 (mod n)
    let half = ring.from((n + PrimeNumber::from(1u8)) >> 1);

    // n + 1 = k * 2^s with k odd
    let n_plus_one = n + PrimeNumber::from(1u8);
    let s = n_plus_one.trailing_zeros().unwrap_or(0);
    let k = &n_plus_one >> s;

    // (U_1, V_1, Q^1)
    let mut u = ring.from(1u8);
    let mut v = p_mod.clone();
    let mut qk = q_mod.clone();

    for bit in (0..k.bit_len().saturating_sub(1)).rev() {
        // Doubling: U_2j = U_j V_j, V_2j = V_j^2 - 2 Q^j
        u = &u * &v;
        v = &v * &v - &qk - &qk;
        qk = &qk * &qk;

        if k.bit(bit) {
            // Increment: U_j+1 = (P U_j + V_j) / 2, V_j+1 = (D U_j + P V_j) / 2
            let next_u = (&p_mod * &u + &v) * &half;
            let next_v = (&d_mod * &u + &p_mod * &v) * &half;
            u = next_u;
            v = next_v;
            qk = &qk * &q_mod;
        }
    }

    if u == zero || v == zero {
        return true;
    }
    for _ in 1..s {
        v = &v * &v - &qk - &qk;
        qk = &qk * &qk;
        if v == zero {
            return true;
        }
    }
    false
}

/// First $D$ of $5, -7, 9, -11, \dots$ with $(D/n) = -1$.
///
/// Returns `None` when `n` is shown composite on the way: a perfect square
/// never yields $-1$, and $(D/n) = 0$ exposes a common factor.
fn selfridge_d(n: &PrimeNumber) -> Option<i64> {
    let mut magnitude: i64 = 5;
    let mut negative = false;
    let mut tried = 0;

    loop {
        let d = if negative { -magnitude } else { magnitude };
        match jacobi(d, n) {
            -1 => return Some(d),
            0 => {
                if u64::try_from(n).ok() != Some(magnitude as u64) {
                    return None;
                }
            }
            _ => {}
        }

        tried += 1;
        if tried == SQUARE_CHECK_AFTER && is_perfect_square(n) {
            return None;
        }
        magnitude += 2;
        negative = !negative;
    }
}

/// Jacobi symbol $(a/n)$ for odd positive `n`.
pub(crate) fn jacobi(a: i64, n: &PrimeNumber) -> i32 {
    let magnitude = PrimeNumber::from(a.unsigned_abs()) % n;
    let mut a = if a < 0 && magnitude != PrimeNumber::from(0u8) {
        n - magnitude
    } else {
        magnitude
    };
    let mut n = n.clone();
    let zero = PrimeNumber::from(0u8);
    let mut result = 1;

    while a != zero {
        let twos = a.trailing_zeros().unwrap_or(0);
        a >>= twos;
        let n_mod_8 = small_residue(&n, 8);
        if twos % 2 == 1 && (n_mod_8 == 3 || n_mod_8 == 5) {
            result = -result;
        }

        std::mem::swap(&mut a, &mut n);
        if small_residue(&a, 4) == 3 && small_residue(&n, 4) == 3 {
            result = -result;
        }
        a %= &n;
    }

    if n == PrimeNumber::from(1u8) {
        result
    } else {
        0
    }
}

/// Integer square root test by Newton iteration.
pub(crate) fn is_perfect_square(n: &PrimeNumber) -> bool {
    let root = isqrt(n);
    &root * &root == *n
}

fn isqrt(n: &PrimeNumber) -> PrimeNumber {
    let one = PrimeNumber::from(1u8);
    if *n <= one {
        return n.clone();
    }
    // Start above the root: 2^ceil(bits / 2) >= sqrt(n)
    let mut x = PrimeNumber::from(1u8) << ((n.bit_len() + 1) / 2);
    loop {
        let y = (&x + n / &x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

#[inline]
fn small_residue(n: &PrimeNumber, m: u64) -> u64 {
    u64::try_from(&(n % PrimeNumber::from(m))).unwrap_or(0)
}
