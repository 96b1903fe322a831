//! GMP-backed library test (`gmp` feature).

use rug::integer::{IsPrime, Order};
use rug::Integer;

use crate::{OracleError, PrimeNumber};

/// Converts through little-endian bytes and asks GMP.
///
/// `IsPrime::Probably` and `IsPrime::Yes` both count as prime.
pub(super) fn is_probable_prime(n: &PrimeNumber, reps: u32) -> Result<bool, OracleError> {
    let value = Integer::from_digits(&n.to_le_bytes(), Order::Lsf);
    if value.significant_bits() as usize != n.bit_len() {
        return Err(OracleError::Backend(format!(
            "conversion to GMP lost bits ({} != {})",
            value.significant_bits(),
            n.bit_len()
        )));
    }
    Ok(value.is_probably_prime(reps) != IsPrime::No)
}
