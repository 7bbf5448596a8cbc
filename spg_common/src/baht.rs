use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const THB_CURRENCY_CODE: &str = "THB";
/// ISO 4217 numeric code for the Thai baht, as used in EMV QR field 53.
pub const THB_NUMERIC_CODE: &str = "764";

const MICRO_PER_BAHT: i64 = 1_000_000;
const MICRO_PER_SATANG: i64 = 10_000;

/// The absolute difference between a slip amount and an order total that still reconciles.
/// Anything less than one baht apart is considered the same payment.
pub const PAYMENT_TOLERANCE: Baht = Baht(MICRO_PER_BAHT);

//--------------------------------------        Baht        ---------------------------------------------------------
/// An amount of Thai baht.
///
/// Stored as an `i64` count of micro-baht (1 ฿ = 1 000 000 µ฿). Slip OCR occasionally reports
/// sub-satang amounts such as `120.999`; micro-baht precision lets those survive the tolerance
/// comparison in the matcher without rounding past the one-baht window.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Baht(i64);

op!(binary Baht, Add, add);
op!(binary Baht, Sub, sub);
op!(inplace Baht, SubAssign, sub_assign);
op!(unary Baht, Neg, neg);

impl Mul<i64> for Baht {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Baht {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in baht: {0}")]
pub struct BahtConversionError(String);

impl From<i64> for Baht {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Baht {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Baht {}

impl TryFrom<f64> for Baht {
    type Error = BahtConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(BahtConversionError(format!("{value} is not a finite amount")));
        }
        let micro = value * MICRO_PER_BAHT as f64;
        if micro.abs() >= i64::MAX as f64 {
            return Err(BahtConversionError(format!("Value {value} is too large to convert to Baht")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(micro.round() as i64))
    }
}

impl FromStr for Baht {
    type Err = BahtConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<f64>()
            .map_err(|e| BahtConversionError(format!("'{s}' is not a decimal baht amount: {e}")))?;
        Self::try_from(value)
    }
}

impl Display for Baht {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-฿{}", self.neg().format_qr())
        } else {
            write!(f, "฿{}", self.format_qr())
        }
    }
}

impl Baht {
    /// The raw micro-baht count.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_baht(baht: i64) -> Self {
        Self(baht * MICRO_PER_BAHT)
    }

    pub fn from_satang(satang: i64) -> Self {
        Self(satang * MICRO_PER_SATANG)
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Renders the amount the way EMV QR field 54 requires it: rounded to satang, with exactly
    /// two decimal places and no grouping.
    pub fn format_qr(&self) -> String {
        let satang = (self.0 + MICRO_PER_SATANG / 2).div_euclid(MICRO_PER_SATANG);
        format!("{}.{:02}", satang / 100, satang % 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Baht::from_baht(120).value(), 120_000_000);
        assert_eq!(Baht::from_satang(12_050).value(), 120_500_000);
        assert_eq!(Baht::try_from(120.999).unwrap().value(), 120_999_000);
        assert_eq!("75.5".parse::<Baht>().unwrap(), Baht::from_satang(7_550));
        assert!("seventy five".parse::<Baht>().is_err());
        assert!(Baht::try_from(f64::NAN).is_err());
    }

    #[test]
    fn qr_formatting() {
        assert_eq!(Baht::from_baht(120).format_qr(), "120.00");
        assert_eq!(Baht::from_satang(7_505).format_qr(), "75.05");
        // Sub-satang amounts round to the nearest satang for display only
        assert_eq!(Baht::try_from(120.999).unwrap().format_qr(), "121.00");
        assert_eq!(Baht::from_baht(1_500).format_qr(), "1500.00");
    }

    #[test]
    fn arithmetic_and_display() {
        let a = Baht::from_baht(100);
        let b = Baht::from_satang(50);
        assert_eq!(a + b, Baht::try_from(100.5).unwrap());
        assert_eq!((b - a).abs(), Baht::try_from(99.5).unwrap());
        assert_eq!(format!("{}", a), "฿100.00");
        assert_eq!(format!("{}", b - a), "-฿99.50");
        assert!((a - b) < PAYMENT_TOLERANCE * 100);
    }
}
