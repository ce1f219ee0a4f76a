//! A decimal percentage, e.g. an interest rate of `12.5` percent a year.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A percentage stored as TEXT and serialised as a JSON string, like [crate::money::Money].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The fraction this percentage represents, e.g. `0.125` for 12.5%.
    pub fn as_fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// `part` as a percentage of `whole`, rounded to two decimal places. Zero when `whole` is zero.
    pub fn of(part: Decimal, whole: Decimal) -> Self {
        if whole.is_zero() {
            return Self::ZERO;
        }

        Self(
            (part * Decimal::ONE_HUNDRED / whole)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// The smaller of `self` and 100%.
    pub fn cap_at_hundred(self) -> Self {
        Self(self.0.min(Decimal::ONE_HUNDRED))
    }
}

impl FromStr for Percent {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl ToSql for Percent {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Percent {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => value
                .as_str()?
                .parse()
                .map_err(|error: rust_decimal::Error| FromSqlError::Other(Box::new(error))),
            ValueRef::Integer(integer) => Ok(Percent(Decimal::from(integer))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
