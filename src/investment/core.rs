//! Investments and their returns.
//!
//! The amount invested is not stored, it is the sum of the deposits minus the withdrawals
//! recorded against the investment.

use std::collections::HashMap;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    db::exists,
    investment::ContributionKind,
    money::Money,
    percent::Percent,
    transaction::{TransactionId, delete_ledger_transaction},
    validation::{optional_text, required_text},
};

pub type InvestmentId = DatabaseId;

text_enum! {
    /// The asset class of an investment.
    pub enum InvestmentKind {
        Stock => "stock",
        Bond => "bond",
        Fund => "fund",
        RealEstate => "real_estate",
        Crypto => "crypto",
        Savings => "savings",
        Other => "other",
    }
}

fn default_investment_kind() -> InvestmentKind {
    InvestmentKind::Other
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Investment {
    pub id: InvestmentId,
    pub name: String,
    pub kind: InvestmentKind,
    /// The broker or bank holding the investment.
    pub institution: Option<String>,
    /// The market value as last reported by the user.
    pub current_value: Money,
    /// Deposits minus withdrawals.
    pub invested_amount: Money,
    pub return_amount: Money,
    pub return_percent: Percent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for creating or replacing an investment.
#[derive(Debug, Clone, Deserialize)]
pub struct InvestmentRequest {
    pub name: String,
    #[serde(default = "default_investment_kind")]
    pub kind: InvestmentKind,
    pub institution: Option<String>,
    /// Zero for new investments and left as is on update when missing.
    pub current_value: Option<Money>,
}

#[cfg(test)]
impl InvestmentRequest {
    pub fn named(name: &str, kind: InvestmentKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            institution: None,
            current_value: None,
        }
    }
}

/// The request body for `PUT /api/investments/{id}/value`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InvestmentValueRequest {
    pub current_value: Money,
}

pub fn create_investment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS investment (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            institution TEXT,
            current_value TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const INVESTMENT_COLUMNS: &str = "id, name, kind, institution, current_value, created_at";

/// Map a row to an investment with nothing invested.
///
/// Use [apply_contribution_totals] to fill in the derived amounts.
fn map_row(row: &Row) -> Result<Investment, rusqlite::Error> {
    Ok(Investment {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        institution: row.get(3)?,
        current_value: row.get(4)?,
        invested_amount: Money::ZERO,
        return_amount: Money::ZERO,
        return_percent: Percent::ZERO,
        created_at: row.get(5)?,
    })
}

/// Sum the deposits minus the withdrawals of the user's investments.
fn get_contribution_totals(
    user_id: UserID,
    investment_id: Option<InvestmentId>,
    connection: &Connection,
) -> Result<HashMap<InvestmentId, Money>, Error> {
    let mut totals: HashMap<InvestmentId, Money> = HashMap::new();

    let mut statement = connection.prepare(
        "SELECT c.investment_id, c.kind, c.amount
        FROM investment_contribution c
        INNER JOIN investment i ON i.id = c.investment_id
        WHERE i.user_id = ?1 AND (?2 IS NULL OR i.id = ?2)",
    )?;
    let rows = statement.query_map((user_id.as_i64(), investment_id), |row| {
        Ok((
            row.get::<_, InvestmentId>(0)?,
            row.get::<_, ContributionKind>(1)?,
            row.get::<_, Money>(2)?,
        ))
    })?;

    for row in rows {
        let (investment_id, kind, amount) = row?;
        let total = totals.entry(investment_id).or_default();
        *total = total.checked_add(kind.signed(amount))?;
    }

    Ok(totals)
}

fn apply_contribution_totals(investment: &mut Investment, totals: &HashMap<InvestmentId, Money>) {
    let invested = totals
        .get(&investment.id)
        .copied()
        .unwrap_or_default()
        .clamp_to_zero();

    investment.invested_amount = invested;
    investment.return_amount = investment.current_value - invested;
    investment.return_percent =
        Percent::of(investment.return_amount.value(), invested.value());
}

fn validate_value(value: Money) -> Result<Money, Error> {
    if value.is_negative() {
        return Err(Error::Validation(format!(
            "current_value cannot be negative, got {value}"
        )));
    }

    Ok(value)
}

pub fn create_investment(
    user_id: UserID,
    request: InvestmentRequest,
    connection: &Connection,
) -> Result<Investment, Error> {
    let name = required_text(&request.name, "name")?;
    let current_value = validate_value(request.current_value.unwrap_or_default())?;

    connection
        .prepare(&format!(
            "INSERT INTO investment (user_id, name, kind, institution, current_value, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING {INVESTMENT_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                name,
                request.kind,
                optional_text(request.institution),
                current_value,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )
        .map_err(Error::from)
}

/// Get an investment of the user with its invested amount and return.
///
/// # Errors
/// Returns [Error::NotFound] if the investment does not exist or belongs to another user.
pub fn get_investment(
    user_id: UserID,
    investment_id: InvestmentId,
    connection: &Connection,
) -> Result<Investment, Error> {
    let mut investment = connection
        .prepare(&format!(
            "SELECT {INVESTMENT_COLUMNS} FROM investment WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((investment_id, user_id.as_i64()), map_row)?;

    let totals = get_contribution_totals(user_id, Some(investment_id), connection)?;
    apply_contribution_totals(&mut investment, &totals);

    Ok(investment)
}

/// Get every investment of the user, ordered by name.
pub fn get_investments(user_id: UserID, connection: &Connection) -> Result<Vec<Investment>, Error> {
    let totals = get_contribution_totals(user_id, None, connection)?;

    connection
        .prepare(&format!(
            "SELECT {INVESTMENT_COLUMNS} FROM investment WHERE user_id = ?1
            ORDER BY name COLLATE NOCASE ASC"
        ))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|investment| -> Result<Investment, Error> {
            let mut investment = investment?;
            apply_contribution_totals(&mut investment, &totals);
            Ok(investment)
        })
        .collect()
}

/// Check that `investment_id` refers to an investment of the user.
///
/// # Errors
/// Returns [Error::InvalidInvestment] if it does not.
pub fn ensure_investment(
    user_id: UserID,
    investment_id: InvestmentId,
    connection: &Connection,
) -> Result<(), Error> {
    let found = exists(
        "SELECT 1 FROM investment WHERE id = ?1 AND user_id = ?2",
        (investment_id, user_id.as_i64()),
        connection,
    )?;

    if found {
        Ok(())
    } else {
        Err(Error::InvalidInvestment(investment_id))
    }
}

pub fn update_investment(
    user_id: UserID,
    investment_id: InvestmentId,
    request: InvestmentRequest,
    connection: &Connection,
) -> Result<Investment, Error> {
    let name = required_text(&request.name, "name")?;
    let current_value = request.current_value.map(validate_value).transpose()?;

    let rows_affected = connection.execute(
        "UPDATE investment
        SET name = ?1, kind = ?2, institution = ?3, current_value = COALESCE(?4, current_value)
        WHERE id = ?5 AND user_id = ?6",
        (
            name,
            request.kind,
            optional_text(request.institution),
            current_value,
            investment_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_investment(user_id, investment_id, connection)
}

/// Set the market value of an investment.
pub fn update_investment_value(
    user_id: UserID,
    investment_id: InvestmentId,
    current_value: Money,
    connection: &Connection,
) -> Result<Investment, Error> {
    let current_value = validate_value(current_value)?;

    let rows_affected = connection.execute(
        "UPDATE investment SET current_value = ?1 WHERE id = ?2 AND user_id = ?3",
        (current_value, investment_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_investment(user_id, investment_id, connection)
}

/// Delete an investment, its contributions and their ledger transactions.
///
/// Goals linked to the investment fall back to tracking the whole portfolio.
pub fn delete_investment(
    user_id: UserID,
    investment_id: InvestmentId,
    connection: &Connection,
) -> Result<(), Error> {
    ensure_investment(user_id, investment_id, connection).map_err(|_| Error::NotFound)?;

    let transaction_ids = connection
        .prepare(
            "SELECT transaction_id FROM investment_contribution
            WHERE investment_id = ?1 AND transaction_id IS NOT NULL",
        )?
        .query_map([investment_id], |row| row.get(0))?
        .collect::<Result<Vec<TransactionId>, _>>()?;

    connection.execute(
        "DELETE FROM investment WHERE id = ?1 AND user_id = ?2",
        (investment_id, user_id.as_i64()),
    )?;

    for transaction_id in transaction_ids {
        delete_ledger_transaction(user_id, transaction_id, connection)?;
    }

    Ok(())
}
