//! Display helpers shared by the history store and the CLI.

use crate::PrimeNumber;

/// Significant digits used for primes in reports and history records.
pub const SCIENTIFIC_PRECISION: usize = 3;

/// Formats `n` in scientific notation without a float conversion.
///
/// `precision` is the number of significant digits kept; the rest are
/// truncated. Values with at most `precision` digits are returned verbatim.
///
/// # Example
/// ```
/// use primerust_core::{format_scientific, PrimeNumber};
///
/// let n = PrimeNumber::from(1_234_567u32);
/// assert_eq!(format_scientific(&n, 3), "1.23e+6");
/// assert_eq!(format_scientific(&PrimeNumber::from(97u8), 3), "97");
/// ```
pub fn format_scientific(n: &PrimeNumber, precision: usize) -> String {
    let digits = n.to_string();
    let precision = precision.max(1);
    if digits.len() <= precision {
        return digits;
    }
    let exponent = digits.len() - 1;
    let (lead, rest) = digits.split_at(1);
    if precision == 1 {
        format!("{lead}e+{exponent}")
    } else {
        format!("{lead}.{}e+{exponent}", &rest[..precision - 1])
    }
}

/// Formats seconds as `mm:ss.d`. Minutes are not wrapped into hours.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let whole = seconds.trunc() as u64;
    let tenths = ((seconds - seconds.trunc()) * 10.0) as u64;
    format!("{:02}:{:02}.{}", whole / 60, whole % 60, tenths.min(9))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scientific_truncates_mantissa() {
        let n = PrimeNumber::from_str_radix(&format!("1239{}", "0".repeat(996)), 10).unwrap();
        assert_eq!(format_scientific(&n, 3), "1.23e+999");
        assert_eq!(format_scientific(&n, 1), "1e+999");
    }

    #[test]
    fn scientific_keeps_short_values() {
        assert_eq!(format_scientific(&PrimeNumber::from(7u8), 3), "7");
        assert_eq!(format_scientific(&PrimeNumber::from(101u8), 3), "101");
        assert_eq!(format_scientific(&PrimeNumber::from(1013u16), 3), "1.01e+3");
    }

    #[test]
    fn time_uses_minutes_seconds_tenths() {
        assert_eq!(format_time(0.0), "00:00.0");
        assert_eq!(format_time(5.27), "00:05.2");
        assert_eq!(format_time(125.95), "02:05.9");
        assert_eq!(format_time(3_600.0), "60:00.0");
    }

    #[test]
    fn time_rejects_garbage() {
        assert_eq!(format_time(-3.0), "00:00.0");
        assert_eq!(format_time(f64::NAN), "00:00.0");
    }
}
