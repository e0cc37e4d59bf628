//! Monetary amounts. Amounts are held as an integer number of cents; decimal strings are only
//! parsed and rendered at the edges.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Matches a `NUMERIC(10, 2)` column: 8 integer digits and 2 fraction digits.
const MAX_SCALE: u32 = 2;
const UPPER_BOUND: i64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("not a decimal number")]
    NotDecimal,
    #[error("must not be negative")]
    Negative,
    #[error("can have at most 2 fraction digits")]
    TooPrecise,
    #[error("can have at most 8 integer digits")]
    TooLarge,
}

#[derive(Debug, Clone, Copy, Default, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Cents(pub i64);

impl Cents {
    pub fn zero() -> Self {
        Self(0)
    }

    fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MAX_SCALE)
    }
}

impl FromStr for Cents {
    type Err = AmountError;

    /// Parses a non-negative decimal such as `"100"`, `"0.5"` or `"12.34"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| AmountError::NotDecimal)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AmountError::Negative);
        }
        if amount.scale() > MAX_SCALE {
            return Err(AmountError::TooPrecise);
        }
        if amount >= Decimal::from(UPPER_BOUND) {
            return Err(AmountError::TooLarge);
        }
        (amount * Decimal::ONE_HUNDRED)
            .to_i64()
            .map(Self)
            .ok_or(AmountError::NotDecimal)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("100", 10_000)]
    #[case("100.00", 10_000)]
    #[case("0.01", 1)]
    #[case("0.5", 50)]
    #[case("12.34", 1_234)]
    #[case(" 7.10 ", 710)]
    #[case("0099999999.99", 9_999_999_999)]
    fn parses_valid_amounts(#[case] input: &str, #[case] cents: i64) {
        assert_eq!(input.parse::<Cents>(), Ok(Cents(cents)));
    }

    #[rstest]
    #[case("", AmountError::NotDecimal)]
    #[case("abc", AmountError::NotDecimal)]
    #[case("1,50", AmountError::NotDecimal)]
    #[case("12..5", AmountError::NotDecimal)]
    #[case("-1", AmountError::Negative)]
    #[case("-0.01", AmountError::Negative)]
    #[case("1.001", AmountError::TooPrecise)]
    #[case("1.000", AmountError::TooPrecise)]
    #[case("100000000", AmountError::TooLarge)]
    #[case("100000000.00", AmountError::TooLarge)]
    fn rejects_invalid_amounts(#[case] input: &str, #[case] error: AmountError) {
        assert_eq!(input.parse::<Cents>(), Err(error));
    }

    #[rstest]
    #[case(Cents(0), "0.00")]
    #[case(Cents(1), "0.01")]
    #[case(Cents(10_000), "100.00")]
    #[case(Cents(1_234), "12.34")]
    #[case(Cents(-5), "-0.05")]
    fn renders_two_fraction_digits(#[case] amount: Cents, #[case] rendered: &str) {
        assert_eq!(amount.to_string(), rendered);
    }

    #[test]
    fn sums_amounts() {
        let total: Cents = [Cents(1), Cents(250), Cents(9_749)].into_iter().sum();
        assert_eq!(total, Cents(10_000));
        assert_eq!(total - Cents(1), Cents(9_999));
    }
}
