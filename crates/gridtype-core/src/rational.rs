//! Exact rational numbers
//!
//! Unit exponents and constant-folded numeric literals are tracked as
//! rationals so that unit algebra never goes through floating point.
//!
//! # Examples
//!
//! ```rust
//! use gridtype_core::Rational;
//!
//! let half = Rational::new(1, 2);
//! let third = Rational::new(1, 3);
//! assert_eq!(half + third, Rational::new(5, 6));
//! assert_eq!(Rational::new(2, 4), half);
//! ```

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A rational number `num / den`, kept in lowest terms with `den > 0` and
/// `num > i64::MIN`, so negation never overflows.
///
/// The std operator impls compute with `i128` intermediates and clamp the
/// normalised result into `i64`; use the `checked_*` methods where overflow
/// must be observable (constant folding and unit algebra do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    /// Zero (0/1)
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    /// One (1/1)
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    /// Create a normalised rational.
    ///
    /// # Panics
    ///
    /// Panics if `den == 0`.
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "rational denominator must be non-zero");
        saturating(num as i128, den as i128)
    }

    /// Create a normalised rational; `None` if `den == 0` or the result
    /// does not fit
    pub fn checked_new(num: i64, den: i64) -> Option<Self> {
        Self::normalise(num as i128, den as i128)
    }

    /// Create an integer rational (n/1); `i64::MIN` clamps to `-i64::MAX`
    pub const fn integer(n: i64) -> Self {
        let num = if n == i64::MIN { -i64::MAX } else { n };
        Rational { num, den: 1 }
    }

    /// Numerator (carries the sign)
    pub const fn numerator(self) -> i64 {
        self.num
    }

    /// Denominator (always positive)
    pub const fn denominator(self) -> i64 {
        self.den
    }

    /// Check if this rational is zero
    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    /// Check if this rational is a whole number
    pub const fn is_integer(self) -> bool {
        self.den == 1
    }

    /// Absolute value
    pub fn abs(self) -> Self {
        Rational { num: self.num.saturating_abs(), den: self.den }
    }

    /// Checked negation
    pub fn checked_neg(self) -> Option<Rational> {
        Some(Rational { num: self.num.checked_neg()?, den: self.den })
    }

    /// Reciprocal, or `None` for zero
    pub fn recip(self) -> Option<Self> {
        if self.num == 0 {
            None
        } else {
            Self::normalise(self.den as i128, self.num as i128)
        }
    }

    /// Convert to f64 (lossy)
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Exact conversion from a decimal: `mantissa / 10^scale`.
    ///
    /// Returns `None` if the value does not fit in `i64` terms.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let mut mantissa = value.mantissa();
        let mut scale = value.scale();
        // Strip trailing zeros first so 1.000 does not overflow 10^scale needlessly.
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        let den = 10i128.checked_pow(scale)?;
        Self::normalise(mantissa, den)
    }

    /// Exact conversion to a decimal, if the denominator divides a power of ten.
    pub fn to_decimal(self) -> Option<Decimal> {
        let num = Decimal::from(self.num);
        let den = Decimal::from(self.den);
        let quotient = num.checked_div(den)?;
        // Only exact if multiplying back reproduces the numerator.
        (quotient.checked_mul(den)? == num).then_some(quotient)
    }

    /// Checked addition
    pub fn checked_add(self, other: Rational) -> Option<Rational> {
        let num = self.num as i128 * other.den as i128 + other.num as i128 * self.den as i128;
        Self::normalise(num, self.den as i128 * other.den as i128)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Rational) -> Option<Rational> {
        self.checked_add(other.checked_neg()?)
    }

    /// Checked multiplication
    pub fn checked_mul(self, other: Rational) -> Option<Rational> {
        Self::normalise(
            self.num as i128 * other.num as i128,
            self.den as i128 * other.den as i128,
        )
    }

    /// Checked division; `None` on division by zero or overflow
    pub fn checked_div(self, other: Rational) -> Option<Rational> {
        self.checked_mul(other.recip()?)
    }

    /// Checked integer power, by repeated squaring
    pub fn checked_pow(self, exponent: i64) -> Option<Rational> {
        let mut base = if exponent < 0 { self.recip()? } else { self };
        let mut remaining = exponent.unsigned_abs();
        let mut result = Rational::ONE;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.checked_mul(base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.checked_mul(base)?;
            }
        }
        Some(result)
    }

    fn normalise(num: i128, den: i128) -> Option<Rational> {
        if den == 0 {
            return None;
        }
        if num == 0 {
            return Some(Rational::ZERO);
        }
        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs()) as i128;
        let sign = if den < 0 { -1 } else { 1 };
        let num = sign * num / divisor;
        let den = sign * den / divisor;
        let num = i64::try_from(num).ok().filter(|n| *n != i64::MIN)?;
        Some(Rational {
            num,
            den: i64::try_from(den).ok()?,
        })
    }
}

/// Greatest common divisor (Euclid)
pub fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn saturating(num: i128, den: i128) -> Rational {
    Rational::normalise(num, den).unwrap_or_else(|| {
        // Only reachable on i64 overflow, which unit exponents never approach.
        Rational { num: (num.signum() * den.signum()) as i64 * i64::MAX, den: 1 }
    })
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, other: Rational) -> Rational {
        saturating(
            self.num as i128 * other.den as i128 + other.num as i128 * self.den as i128,
            self.den as i128 * other.den as i128,
        )
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, other: Rational) -> Rational {
        self + (-other)
    }
}

impl Mul for Rational {
    type Output = Rational;

    fn mul(self, other: Rational) -> Rational {
        saturating(
            self.num as i128 * other.num as i128,
            self.den as i128 * other.den as i128,
        )
    }
}

impl Div for Rational {
    type Output = Rational;

    /// # Panics
    ///
    /// Panics on division by zero, like integer division.
    fn div(self, other: Rational) -> Rational {
        assert!(other.num != 0, "rational division by zero");
        saturating(
            self.num as i128 * other.den as i128,
            self.den as i128 * other.num as i128,
        )
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational { num: self.num.saturating_neg(), den: self.den }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num as i128 * other.den as i128).cmp(&(other.num as i128 * self.den as i128))
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Rational::integer(n)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_normalisation() {
        assert_eq!(Rational::new(6, 9), Rational::new(2, 3));
        assert_eq!(Rational::new(1, -2), Rational::new(-1, 2));
        assert_eq!(Rational::new(0, 7), Rational::ZERO);
        assert_eq!(Rational::new(-4, -2), Rational::integer(2));
    }

    #[test]
    fn test_arithmetic() {
        let half = Rational::new(1, 2);
        let third = Rational::new(1, 3);
        assert_eq!(half + third, Rational::new(5, 6));
        assert_eq!(half - third, Rational::new(1, 6));
        assert_eq!(half * third, Rational::new(1, 6));
        assert_eq!(half / third, Rational::new(3, 2));
        assert_eq!(-half, Rational::new(-1, 2));
    }

    #[test]
    fn test_checked_overflow() {
        let big = Rational::integer(i64::MAX);
        assert_eq!(big.checked_add(Rational::ONE), None);
        assert_eq!(Rational::ONE.checked_div(Rational::ZERO), None);
        assert_eq!(Rational::integer(2).checked_pow(10), Some(Rational::integer(1024)));
        assert_eq!(Rational::integer(2).checked_pow(-2), Some(Rational::new(1, 4)));
        assert_eq!(Rational::integer(2).checked_pow(63), None);
        assert_eq!(Rational::integer(-2).checked_pow(62), Some(Rational::integer(1 << 62)));
        assert_eq!(Rational::ZERO.checked_pow(-1), None);
    }

    #[test]
    fn test_pow_of_unit_bases_with_huge_exponents() {
        assert_eq!(Rational::ONE.checked_pow(100_000_000_000_000_000), Some(Rational::ONE));
        assert_eq!(
            Rational::integer(-1).checked_pow(100_000_000_000_000_001),
            Some(Rational::integer(-1))
        );
        assert_eq!(Rational::ZERO.checked_pow(i64::MAX), Some(Rational::ZERO));
        assert_eq!(Rational::new(1, 2).checked_pow(i64::MIN), None);
    }

    #[test]
    fn test_most_negative_numerator_is_not_representable() {
        assert_eq!(Rational::checked_new(i64::MIN, 1), None);
        assert_eq!(Rational::checked_new(i64::MIN, 2), Some(Rational::integer(-(1 << 62))));
        assert_eq!(Rational::integer(i64::MIN), Rational::integer(-i64::MAX));
        let lowest = Rational::integer(-i64::MAX);
        assert_eq!(lowest.checked_sub(Rational::ONE), None);
        assert_eq!(lowest.checked_neg(), Some(Rational::integer(i64::MAX)));
        assert_eq!(Rational::from_decimal(Decimal::from(i64::MIN)), None);
    }

    #[test]
    fn test_decimal_conversion() {
        let d = Decimal::from_str("0.5").unwrap();
        assert_eq!(Rational::from_decimal(d), Some(Rational::new(1, 2)));

        let d = Decimal::from_str("1.250").unwrap();
        assert_eq!(Rational::from_decimal(d), Some(Rational::new(5, 4)));

        assert_eq!(
            Rational::new(3, 4).to_decimal(),
            Some(Decimal::from_str("0.75").unwrap())
        );
        assert_eq!(Rational::new(1, 3).to_decimal(), None);
    }

    #[test]
    fn test_ordering_and_display() {
        assert!(Rational::new(1, 3) < Rational::new(1, 2));
        assert_eq!(Rational::new(-3, 6).to_string(), "-1/2");
        assert_eq!(Rational::integer(4).to_string(), "4");
    }
}
