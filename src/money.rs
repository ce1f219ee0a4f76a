//! A decimal type for monetary amounts.
//!
//! Amounts are stored as TEXT in the database so that no precision is lost to
//! floating point conversions, and serialised as JSON strings, e.g. `"12.50"`.

use std::{
    fmt::{self, Display, Formatter},
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::Error;

/// The largest magnitude, in whole units, accepted for an amount from a client.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Amounts from clients may not be more precise than cents.
const MAX_SCALE: u32 = 2;

/// An amount of money.
///
/// Amounts read from JSON are limited to [MAX_AMOUNT] and at most two decimal places, so that
/// sums over a user's records stay far from the limits of [Decimal].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Create an amount from a decimal value.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create an amount from a whole number of cents, e.g. `1050` is `10.50`.
    #[cfg(test)]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Check that the amount is at most [MAX_AMOUNT] in magnitude and has no fractions of a cent.
    ///
    /// # Errors
    ///
    /// Returns [crate::Error::Validation] naming `field` if either check fails.
    pub fn ensure_in_range(self, field: &str) -> Result<Self, Error> {
        if self.0.normalize().scale() > MAX_SCALE {
            return Err(Error::Validation(format!(
                "{field} cannot have more than {MAX_SCALE} decimal places, got {self}"
            )));
        }

        if self.0.abs() > Decimal::from(MAX_AMOUNT) {
            return Err(Error::Validation(format!(
                "{field} cannot be more than {MAX_AMOUNT} in magnitude, got {self}"
            )));
        }

        Ok(self)
    }

    /// Check that the amount is greater than zero and within [Money::ensure_in_range].
    ///
    /// # Errors
    ///
    /// Returns [crate::Error::Validation] naming `field` if the amount is zero, negative, too
    /// large or too precise.
    pub fn ensure_positive(self, field: &str) -> Result<Self, Error> {
        if !self.is_positive() {
            return Err(Error::Validation(format!(
                "{field} must be greater than zero, got {self}"
            )));
        }

        self.ensure_in_range(field)
    }

    /// Add two amounts, failing instead of overflowing.
    ///
    /// # Errors
    ///
    /// Returns [crate::Error::Validation] if the sum does not fit in a [Decimal].
    pub fn checked_add(self, rhs: Self) -> Result<Self, Error> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| Error::Validation(format!("the sum of {self} and {rhs} is too large")))
    }

    /// Sum `amounts` with [Money::checked_add].
    ///
    /// # Errors
    ///
    /// Returns [crate::Error::Validation] if the total does not fit in a [Decimal].
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Result<Self, Error> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }

    /// Round to whole cents, with halves rounded away from zero.
    pub fn round_to_cents(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// The larger of `self` and zero.
    pub fn clamp_to_zero(self) -> Self {
        if self.is_negative() { Self::ZERO } else { self }
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Money(<Decimal as Deserialize>::deserialize(deserializer)?)
            .ensure_in_range("amount")
            .map_err(de::Error::custom)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => value
                .as_str()?
                .parse()
                .map_err(|error: rust_decimal::Error| FromSqlError::Other(Box::new(error))),
            ValueRef::Integer(integer) => Ok(Money::from(integer)),
            ValueRef::Real(real) => Decimal::try_from(real)
                .map(Money)
                .map_err(|error| FromSqlError::Other(Box::new(error))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
