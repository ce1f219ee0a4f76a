//! Installment loans and their progress.

use std::collections::HashSet;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{AccountId, ensure_account},
    auth::UserID,
    category::{CategoryId, resolve_category},
    database_id::DatabaseId,
    db::exists,
    financing::{AmortizationSystem, Installment, amortization_schedule},
    money::Money,
    percent::Percent,
    transaction::{TransactionId, TransactionKind, delete_ledger_transaction},
    validation::{optional_text, required_text},
};

pub type FinancingId = DatabaseId;

/// The most installments a financing may have, fifty years of monthly payments.
pub const MAX_INSTALLMENTS: u32 = 600;

/// An installment loan such as a mortgage or car loan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Financing {
    pub id: FinancingId,
    pub description: String,
    pub lender: Option<String>,
    pub principal: Money,
    pub annual_interest_rate: Percent,
    pub installments: u32,
    pub first_due_date: Date,
    pub system: AmortizationSystem,
    /// The account installments are paid from when a payment does not name one.
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// How far a financing has been paid off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancingSummary {
    pub paid_installments: u32,
    pub total_paid: Money,
    /// The principal still to be amortized.
    pub outstanding_balance: Money,
    /// The interest over the whole schedule.
    pub total_interest: Money,
    pub next_installment: Option<Installment>,
    pub is_settled: bool,
}

/// A financing along with its summary, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancingDetails {
    #[serde(flatten)]
    pub financing: Financing,
    pub summary: FinancingSummary,
}

/// A schedule row with whether it has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledInstallment {
    #[serde(flatten)]
    pub installment: Installment,
    pub paid: bool,
}

/// The request body for creating or replacing a financing.
#[derive(Debug, Clone, Deserialize)]
pub struct FinancingRequest {
    pub description: String,
    pub lender: Option<String>,
    pub principal: Money,
    #[serde(default)]
    pub annual_interest_rate: Percent,
    pub installments: u32,
    pub first_due_date: Date,
    pub system: AmortizationSystem,
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
}

pub fn create_financing_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS financing (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            lender TEXT,
            principal TEXT NOT NULL,
            annual_interest_rate TEXT NOT NULL,
            installments INTEGER NOT NULL,
            first_due_date TEXT NOT NULL,
            system TEXT NOT NULL,
            account_id INTEGER,
            category_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON DELETE SET NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE SET NULL
        )",
        (),
    )?;

    Ok(())
}

const FINANCING_COLUMNS: &str = "id, description, lender, principal, annual_interest_rate, \
    installments, first_due_date, system, account_id, category_id, created_at";

fn map_row(row: &Row) -> Result<Financing, rusqlite::Error> {
    Ok(Financing {
        id: row.get(0)?,
        description: row.get(1)?,
        lender: row.get(2)?,
        principal: row.get(3)?,
        annual_interest_rate: row.get(4)?,
        installments: row.get(5)?,
        first_due_date: row.get(6)?,
        system: row.get(7)?,
        account_id: row.get(8)?,
        category_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl Financing {
    pub fn schedule(&self) -> Result<Vec<Installment>, Error> {
        amortization_schedule(
            self.principal,
            self.annual_interest_rate,
            self.installments,
            self.first_due_date,
            self.system,
        )
    }
}

fn validate_request(
    user_id: UserID,
    request: FinancingRequest,
    connection: &Connection,
) -> Result<FinancingRequest, Error> {
    let principal = request.principal.ensure_positive("principal")?;

    if !(1..=MAX_INSTALLMENTS).contains(&request.installments) {
        return Err(Error::Validation(format!(
            "installments must be between 1 and {MAX_INSTALLMENTS}, got {}",
            request.installments
        )));
    }

    let rate = request.annual_interest_rate.value();
    if rate.is_sign_negative() || rate > rust_decimal::Decimal::ONE_HUNDRED {
        return Err(Error::Validation(format!(
            "annual_interest_rate must be between 0 and 100, got {rate}"
        )));
    }

    amortization_schedule(
        principal,
        request.annual_interest_rate,
        request.installments,
        request.first_due_date,
        request.system,
    )?;

    if let Some(account_id) = request.account_id {
        ensure_account(user_id, account_id, connection)?;
    }

    let category_id = request
        .category_id
        .map(|category_id| {
            resolve_category(
                user_id,
                Some(category_id),
                TransactionKind::Expense,
                connection,
            )
        })
        .transpose()?;

    Ok(FinancingRequest {
        description: required_text(&request.description, "description")?,
        lender: optional_text(request.lender),
        principal,
        category_id,
        ..request
    })
}

pub fn create_financing(
    user_id: UserID,
    request: FinancingRequest,
    connection: &Connection,
) -> Result<Financing, Error> {
    let request = validate_request(user_id, request, connection)?;

    connection
        .prepare(&format!(
            "INSERT INTO financing (user_id, description, lender, principal, \
            annual_interest_rate, installments, first_due_date, system, account_id, \
            category_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING {FINANCING_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                request.description,
                request.lender,
                request.principal,
                request.annual_interest_rate,
                request.installments,
                request.first_due_date,
                request.system,
                request.account_id,
                request.category_id,
                OffsetDateTime::now_utc(),
            ],
            map_row,
        )
        .map_err(Error::from)
}

pub fn get_financing(
    user_id: UserID,
    financing_id: FinancingId,
    connection: &Connection,
) -> Result<Financing, Error> {
    connection
        .prepare(&format!(
            "SELECT {FINANCING_COLUMNS} FROM financing WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((financing_id, user_id.as_i64()), map_row)
        .map_err(Error::from)
}

/// Get the user's financings, oldest first.
pub fn get_financings(user_id: UserID, connection: &Connection) -> Result<Vec<Financing>, Error> {
    connection
        .prepare(&format!(
            "SELECT {FINANCING_COLUMNS} FROM financing WHERE user_id = ?1
            ORDER BY first_due_date ASC, id ASC"
        ))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|financing| financing.map_err(Error::from))
        .collect()
}

/// The installment numbers that have been paid and the total paid.
pub(crate) fn get_paid_installments(
    financing_id: FinancingId,
    connection: &Connection,
) -> Result<(HashSet<u32>, Money), Error> {
    let mut paid = HashSet::new();
    let mut total = Money::ZERO;

    let mut statement = connection
        .prepare("SELECT installment_number, amount FROM financing_payment WHERE financing_id = ?1")?;
    let rows = statement.query_map([financing_id], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, Money>(1)?))
    })?;

    for row in rows {
        let (number, amount) = row?;
        paid.insert(number);
        total = total.checked_add(amount)?;
    }

    Ok((paid, total))
}

/// Summarise the progress of paying off `financing`.
pub fn get_financing_summary(
    financing: &Financing,
    connection: &Connection,
) -> Result<FinancingSummary, Error> {
    let schedule = financing.schedule()?;
    let (paid, total_paid) = get_paid_installments(financing.id, connection)?;

    let amortized: Money = schedule
        .iter()
        .filter(|installment| paid.contains(&installment.number))
        .map(|installment| installment.amortization)
        .sum();
    let next_installment = schedule
        .iter()
        .find(|installment| !paid.contains(&installment.number))
        .copied();

    Ok(FinancingSummary {
        paid_installments: paid.len() as u32,
        total_paid,
        outstanding_balance: financing.principal - amortized,
        total_interest: schedule.iter().map(|installment| installment.interest).sum(),
        is_settled: next_installment.is_none(),
        next_installment,
    })
}

/// Attach the summary to a financing.
pub fn with_summary(
    financing: Financing,
    connection: &Connection,
) -> Result<FinancingDetails, Error> {
    let summary = get_financing_summary(&financing, connection)?;

    Ok(FinancingDetails { financing, summary })
}

/// Get the amortization schedule of a financing with the paid installments marked.
pub fn get_schedule(
    user_id: UserID,
    financing_id: FinancingId,
    connection: &Connection,
) -> Result<Vec<ScheduledInstallment>, Error> {
    let financing = get_financing(user_id, financing_id, connection)?;
    let (paid, _) = get_paid_installments(financing.id, connection)?;

    Ok(financing
        .schedule()?
        .into_iter()
        .map(|installment| ScheduledInstallment {
            paid: paid.contains(&installment.number),
            installment,
        })
        .collect())
}

/// Replace the details of a financing.
///
/// # Errors
/// Returns [Error::FinancingHasPayments] if the principal, rate, installments, first due date or
/// system change after installments have been paid.
pub fn update_financing(
    user_id: UserID,
    financing_id: FinancingId,
    request: FinancingRequest,
    connection: &Connection,
) -> Result<Financing, Error> {
    let existing = get_financing(user_id, financing_id, connection)?;
    let request = validate_request(user_id, request, connection)?;

    let terms_changed = existing.principal != request.principal
        || existing.annual_interest_rate != request.annual_interest_rate
        || existing.installments != request.installments
        || existing.first_due_date != request.first_due_date
        || existing.system != request.system;

    if terms_changed
        && exists(
            "SELECT 1 FROM financing_payment WHERE financing_id = ?1",
            [financing_id],
            connection,
        )?
    {
        return Err(Error::FinancingHasPayments);
    }

    connection
        .prepare(&format!(
            "UPDATE financing SET description = ?1, lender = ?2, principal = ?3,
                annual_interest_rate = ?4, installments = ?5, first_due_date = ?6, system = ?7,
                account_id = ?8, category_id = ?9
            WHERE id = ?10 AND user_id = ?11
            RETURNING {FINANCING_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                request.description,
                request.lender,
                request.principal,
                request.annual_interest_rate,
                request.installments,
                request.first_due_date,
                request.system,
                request.account_id,
                request.category_id,
                financing_id,
                user_id.as_i64(),
            ],
            map_row,
        )
        .map_err(Error::from)
}

/// Delete a financing with its installment payments and their ledger transactions.
pub fn delete_financing(
    user_id: UserID,
    financing_id: FinancingId,
    connection: &Connection,
) -> Result<(), Error> {
    get_financing(user_id, financing_id, connection)?;

    let transaction_ids = connection
        .prepare(
            "SELECT transaction_id FROM financing_payment
            WHERE financing_id = ?1 AND transaction_id IS NOT NULL",
        )?
        .query_map([financing_id], |row| row.get(0))?
        .collect::<Result<Vec<TransactionId>, _>>()?;

    connection.execute(
        "DELETE FROM financing WHERE id = ?1 AND user_id = ?2",
        (financing_id, user_id.as_i64()),
    )?;

    for transaction_id in transaction_ids {
        delete_ledger_transaction(user_id, transaction_id, connection)?;
    }

    Ok(())
}
