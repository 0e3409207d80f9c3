//! Exact base-10 decimal values for normalized statistics.
//!
//! # Invariants
//! - A `Decimal` is always normalized: no trailing zeros in the mantissa
//!   unless the scale is zero, and zero is never negative.
//! - Conversions to fixed-point storage round half to even.

use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Finest scale kept after parsing; smaller digits are rounded away.
const MAX_SCALE: u32 = 28;

/// Decimal number `mantissa * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    /// Builds a normalized decimal; scales beyond 28 places are rounded.
    pub fn new(mantissa: i128, scale: u32) -> Self {
        let (mantissa, scale) = if scale > MAX_SCALE {
            (round_div_pow10(mantissa, scale - MAX_SCALE), MAX_SCALE)
        } else {
            (mantissa, scale)
        };
        normalize(mantissa, scale)
    }

    /// Rebuilds a decimal from its fixed-point storage representation.
    pub fn from_scaled(units: i64, places: u32) -> Self {
        Self::new(i128::from(units), places)
    }

    pub fn mantissa(self) -> i128 {
        self.mantissa
    }

    pub fn scale(self) -> u32 {
        self.scale
    }

    pub fn is_zero(self) -> bool {
        self.mantissa == 0
    }

    /// Parses decimal text such as `0.00057`, `-12`, `4.88e-07`.
    ///
    /// Returns `None` for anything that is not a finite base-10 number,
    /// including `NaN`/`inf` spellings and mantissas wider than 38 digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        let (number, exponent) = match text.find(['e', 'E']) {
            Some(split) => (&text[..split], parse_exponent(&text[split + 1..])?),
            None => (text, 0),
        };

        let (negative, digits) = match number.as_bytes().first()? {
            b'-' => (true, &number[1..]),
            b'+' => (false, &number[1..]),
            _ => (false, number),
        };

        let mut mantissa: i128 = 0;
        let mut fraction_digits: i64 = 0;
        let mut seen_digit = false;
        let mut seen_point = false;
        for byte in digits.bytes() {
            match byte {
                b'0'..=b'9' => {
                    mantissa = mantissa
                        .checked_mul(10)?
                        .checked_add(i128::from(byte - b'0'))?;
                    seen_digit = true;
                    if seen_point {
                        fraction_digits += 1;
                    }
                }
                b'.' if !seen_point => seen_point = true,
                _ => return None,
            }
        }
        if !seen_digit {
            return None;
        }
        if negative {
            mantissa = -mantissa;
        }

        let scale = fraction_digits.checked_sub(exponent)?;
        if scale < 0 {
            let factor = pow10(u32::try_from(scale.checked_neg()?).ok()?)?;
            return Some(normalize(mantissa.checked_mul(factor)?, 0));
        }
        Some(Self::new(mantissa, u32::try_from(scale).ok()?))
    }

    /// Converts to fixed-point units with `places` decimal places.
    ///
    /// Returns `None` when the rounded value does not fit into `i64`.
    pub fn to_scaled(self, places: u32) -> Option<i64> {
        let units = if self.scale <= places {
            self.mantissa.checked_mul(pow10(places - self.scale)?)?
        } else {
            round_div_pow10(self.mantissa, self.scale - places)
        };
        i64::try_from(units).ok()
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{whole}.{fraction}")
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_exponent(raw: &str) -> Option<i64> {
    let (negative, digits) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

fn pow10(exponent: u32) -> Option<i128> {
    10_i128.checked_pow(exponent)
}

/// Divides by `10^exponent`, rounding half to even.
fn round_div_pow10(value: i128, exponent: u32) -> i128 {
    let Some(divisor) = pow10(exponent) else {
        return 0;
    };
    let magnitude = value.unsigned_abs();
    let divisor = divisor.unsigned_abs();
    let mut quotient = magnitude / divisor;
    let remainder = magnitude % divisor;
    let twice = remainder * 2;
    if twice > divisor || (twice == divisor && quotient % 2 == 1) {
        quotient += 1;
    }
    // quotient <= |value|, so the cast back cannot overflow.
    let quotient = quotient as i128;
    if value < 0 {
        -quotient
    } else {
        quotient
    }
}

fn normalize(mut mantissa: i128, mut scale: u32) -> Decimal {
    if mantissa == 0 {
        return Decimal::ZERO;
    }
    while scale > 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        scale -= 1;
    }
    Decimal { mantissa, scale }
}

#[cfg(test)]
mod tests {
    use super::Decimal;

    #[test]
    fn parses_plain_and_scientific_notation() {
        assert_eq!(Decimal::parse("0.00057"), Some(Decimal::new(57, 5)));
        assert_eq!(Decimal::parse("-12"), Some(Decimal::new(-12, 0)));
        assert_eq!(Decimal::parse("4.88e-07"), Some(Decimal::new(488, 9)));
        assert_eq!(Decimal::parse("1.5E3"), Some(Decimal::new(1500, 0)));
        assert_eq!(Decimal::parse(" +.5 "), Some(Decimal::new(5, 1)));
        assert_eq!(Decimal::parse("7."), Some(Decimal::new(7, 0)));
    }

    #[test]
    fn normalizes_trailing_zeros_and_negative_zero() {
        assert_eq!(Decimal::parse("1.2300"), Some(Decimal::new(123, 2)));
        assert_eq!(Decimal::parse("-0.000"), Some(Decimal::ZERO));
    }

    #[test]
    fn rejects_non_numbers() {
        for raw in [
            "", " ", ".", "-", "abc", "1.2.3", "1e", "e5", "NaN", "inf", "1,5", "0x10", "1e+",
            "0.1e-9223372036854775807",
        ] {
            assert_eq!(Decimal::parse(raw), None, "input {raw:?}");
        }
    }

    #[test]
    fn rejects_mantissa_overflow() {
        let huge = "9".repeat(60);
        assert_eq!(Decimal::parse(&huge), None);
    }

    #[test]
    fn to_scaled_rounds_half_to_even() {
        assert_eq!(Decimal::new(125, 7).to_scaled(5), Some(1));
        assert_eq!(Decimal::new(15, 6).to_scaled(5), Some(2));
        assert_eq!(Decimal::new(25, 6).to_scaled(5), Some(2));
        assert_eq!(Decimal::new(1_000_005, 6).to_scaled(5), Some(100_000));
        assert_eq!(Decimal::new(1_000_015, 6).to_scaled(5), Some(100_002));
        assert_eq!(Decimal::new(-1_000_015, 6).to_scaled(5), Some(-100_002));
        assert_eq!(Decimal::new(57, 5).to_scaled(5), Some(57));
        assert_eq!(Decimal::new(3, 0).to_scaled(5), Some(300_000));
    }

    #[test]
    fn to_scaled_reports_overflow() {
        let wide = Decimal::parse("1e30").expect("valid decimal");
        assert_eq!(wide.to_scaled(5), None);
    }

    #[test]
    fn display_matches_canonical_form() {
        assert_eq!(Decimal::new(57, 5).to_string(), "0.00057");
        assert_eq!(Decimal::new(-1505, 2).to_string(), "-15.05");
        assert_eq!(Decimal::new(42, 0).to_string(), "42");
        assert_eq!(Decimal::from_scaled(100_002, 5).to_string(), "1.00002");
    }
}
