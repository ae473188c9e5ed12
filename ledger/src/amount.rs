//! # Exact Rational Money
//!
//! Every balance and transfer amount in Tally is an [`Amount`]: a thin
//! newtype over `BigRational`. Exactness is not a nicety here — recurring
//! transfers divide a total by a tick count, and with floats or fixed-point
//! decimals the installments would not sum back to the total. With
//! rationals, `total / ticks * ticks == total`, always, across process
//! restarts.
//!
//! ## Wire form
//!
//! In the ledger an amount is always serialized as `numerator/denominator`
//! (`20/1`, `5/3`), which round-trips exactly. Parsing also accepts a bare
//! integer (`20`) for operator convenience. [`std::fmt::Display`] renders
//! the reduced human form: integers without the `/1`.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// An exact rational quantity of currency.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigRational);

/// Failure to parse an amount literal.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid amount literal `{0}`")]
pub struct ParseAmountError(pub String);

impl Amount {
    /// Zero currency.
    pub fn zero() -> Self {
        Amount(BigRational::zero())
    }

    /// An integral amount.
    pub fn from_int(value: i64) -> Self {
        Amount(BigRational::from_integer(BigInt::from(value)))
    }

    /// An exact ratio. Panics if `denom` is zero, which is why this is only
    /// exposed for literals in tests and config — parsing guards against it.
    pub fn from_ratio(numer: i64, denom: i64) -> Self {
        Amount(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    /// `true` if strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// `true` if strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// `true` if exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Rounds to the nearest whole unit (ties away from zero). Used by the
    /// tax engine, which assesses in whole currency units.
    pub fn round(&self) -> Self {
        Amount(self.0.round())
    }

    /// The canonical ledger serialization: always `numerator/denominator`.
    pub fn ledger_form(&self) -> String {
        format!("{}/{}", self.0.numer(), self.0.denom())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_integer() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAmountError(s.to_string());
        match s.split_once('/') {
            Some((n, d)) => {
                let numer = BigInt::from_str(n).map_err(|_| err())?;
                let denom = BigInt::from_str(d).map_err(|_| err())?;
                if denom.is_zero() {
                    return Err(err());
                }
                Ok(Amount(BigRational::new(numer, denom)))
            }
            None => {
                let numer = BigInt::from_str(s).map_err(|_| err())?;
                Ok(Amount(BigRational::from_integer(numer)))
            }
        }
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::zero()
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::from_int(value)
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Amount::from_int(i64::from(value))
    }
}

// Arithmetic is by-value; balances are cloned at call sites. These are
// human-scale quantities, not a hot loop.

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Mul for Amount {
    type Output = Amount;
    fn mul(self, rhs: Amount) -> Amount {
        Amount(self.0 * rhs.0)
    }
}

impl Div for Amount {
    type Output = Amount;
    fn div(self, rhs: Amount) -> Amount {
        Amount(self.0 / rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.ledger_form())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_integer_literal() {
        let a: Amount = "20".parse().unwrap();
        assert_eq!(a, Amount::from_int(20));
    }

    #[test]
    fn parse_ratio_literal() {
        let a: Amount = "5/3".parse().unwrap();
        assert_eq!(a, Amount::from_ratio(5, 3));
    }

    #[test]
    fn parse_negative() {
        let a: Amount = "-7/2".parse().unwrap();
        assert!(a.is_negative());
        assert_eq!(a, Amount::from_ratio(-7, 2));
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert!("3/0".parse::<Amount>().is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("3.5".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
        assert!("a/b".parse::<Amount>().is_err());
    }

    #[test]
    fn ledger_form_round_trips() {
        for text in ["20/1", "5/3", "-7/2", "0/1"] {
            let a: Amount = text.parse().unwrap();
            assert_eq!(a.ledger_form(), text);
            assert_eq!(a.ledger_form().parse::<Amount>().unwrap(), a);
        }
    }

    #[test]
    fn ledger_form_is_reduced() {
        let a: Amount = "10/4".parse().unwrap();
        assert_eq!(a.ledger_form(), "5/2");
    }

    #[test]
    fn display_drops_unit_denominator() {
        assert_eq!(Amount::from_int(20).to_string(), "20");
        assert_eq!(Amount::from_ratio(5, 3).to_string(), "5/3");
    }

    #[test]
    fn division_is_exact() {
        // The recurring-transfer property: installments sum to the total.
        let total = Amount::from_int(10);
        let per_tick = total.clone() / Amount::from_int(3);
        let mut sum = Amount::zero();
        for _ in 0..3 {
            sum += per_tick.clone();
        }
        assert_eq!(sum, total);
    }

    #[test]
    fn round_ties_away_from_zero() {
        assert_eq!(Amount::from_ratio(5, 2).round(), Amount::from_int(3));
        assert_eq!(Amount::from_ratio(-5, 2).round(), Amount::from_int(-3));
        assert_eq!(Amount::from_ratio(7, 3).round(), Amount::from_int(2));
    }

    #[test]
    fn ordering_is_numeric() {
        let half: Amount = "1/2".parse().unwrap();
        let third: Amount = "1/3".parse().unwrap();
        assert!(third < half);
        assert!(Amount::from_int(-1) < Amount::zero());
    }
}
