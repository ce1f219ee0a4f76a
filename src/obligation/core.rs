//! Receivables and payables.
//!
//! Only the amount and dates are stored. How much has been paid, what remains and the status are
//! derived from the payments with [settle] whenever an obligation is read.

use std::collections::HashMap;

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    category::{CategoryId, resolve_category},
    counterparty::{CounterpartyId, CounterpartyKind, ensure_counterparty},
    database_id::DatabaseId,
    db::exists,
    money::Money,
    obligation::{Settlement, SettlementStatus, settle},
    transaction::{TransactionId, TransactionKind, delete_ledger_transaction},
    validation::{optional_text, required_text},
};

pub type ObligationId = DatabaseId;

text_enum! {
    /// Whether the money is owed to the user or by the user.
    pub enum Direction {
        Receivable => "receivable",
        Payable => "payable",
    }
}

impl Direction {
    /// Receivables are owed by customers, payables are owed to suppliers.
    pub fn counterparty_kind(&self) -> CounterpartyKind {
        match self {
            Direction::Receivable => CounterpartyKind::Customer,
            Direction::Payable => CounterpartyKind::Supplier,
        }
    }

    /// The kind of ledger transaction a payment creates.
    pub fn transaction_kind(&self) -> TransactionKind {
        match self {
            Direction::Receivable => TransactionKind::Income,
            Direction::Payable => TransactionKind::Expense,
        }
    }
}

/// An amount owed to or by the user with its settlement derived from its payments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obligation {
    pub id: ObligationId,
    pub direction: Direction,
    pub counterparty_id: Option<CounterpartyId>,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub amount: Money,
    pub issue_date: Date,
    pub due_date: Date,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub settlement: Settlement,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for creating or replacing a receivable or payable.
#[derive(Debug, Clone, Deserialize)]
pub struct ObligationRequest {
    pub counterparty_id: Option<CounterpartyId>,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub amount: Money,
    /// Defaults to today.
    pub issue_date: Option<Date>,
    pub due_date: Date,
    pub notes: Option<String>,
}

/// The query parameters for the receivable and payable lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObligationQuery {
    pub status: Option<SettlementStatus>,
    pub counterparty_id: Option<CounterpartyId>,
    /// Inclusive start of the due date range.
    pub from: Option<Date>,
    /// Inclusive end of the due date range.
    pub to: Option<Date>,
    /// Only obligations that are (or are not) overdue.
    pub overdue: Option<bool>,
}

pub fn create_obligation_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS obligation (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            direction TEXT NOT NULL,
            counterparty_id INTEGER,
            category_id INTEGER,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            issue_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(counterparty_id) REFERENCES counterparty(id) ON UPDATE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_obligation_user_due
            ON obligation(user_id, direction, due_date);",
    )?;

    Ok(())
}

const OBLIGATION_COLUMNS: &str = "id, direction, counterparty_id, category_id, description, \
    amount, issue_date, due_date, notes, created_at";

/// An obligation as stored, before its payments are applied.
struct ObligationRow {
    id: ObligationId,
    direction: Direction,
    counterparty_id: Option<CounterpartyId>,
    category_id: Option<CategoryId>,
    description: String,
    amount: Money,
    issue_date: Date,
    due_date: Date,
    notes: Option<String>,
    created_at: OffsetDateTime,
}

impl ObligationRow {
    fn settle(self, payments: &[Money], today: Date) -> Obligation {
        Obligation {
            settlement: settle(self.amount, payments, self.due_date, today),
            id: self.id,
            direction: self.direction,
            counterparty_id: self.counterparty_id,
            category_id: self.category_id,
            description: self.description,
            amount: self.amount,
            issue_date: self.issue_date,
            due_date: self.due_date,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

fn map_row(row: &Row) -> Result<ObligationRow, rusqlite::Error> {
    Ok(ObligationRow {
        id: row.get(0)?,
        direction: row.get(1)?,
        counterparty_id: row.get(2)?,
        category_id: row.get(3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        issue_date: row.get(6)?,
        due_date: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Get the payment amounts of the user's obligations grouped by obligation.
fn get_payment_amounts(
    user_id: UserID,
    direction: Direction,
    obligation_id: Option<ObligationId>,
    connection: &Connection,
) -> Result<HashMap<ObligationId, Vec<Money>>, Error> {
    let mut amounts: HashMap<ObligationId, Vec<Money>> = HashMap::new();

    let mut statement = connection.prepare(
        "SELECT payment.obligation_id, payment.amount
        FROM payment INNER JOIN obligation ON obligation.id = payment.obligation_id
        WHERE obligation.user_id = ?1 AND obligation.direction = ?2
            AND (?3 IS NULL OR obligation.id = ?3)",
    )?;
    let rows = statement.query_map((user_id.as_i64(), direction, obligation_id), |row| {
        Ok((row.get::<_, ObligationId>(0)?, row.get::<_, Money>(1)?))
    })?;

    for row in rows {
        let (obligation_id, amount) = row?;
        amounts.entry(obligation_id).or_default().push(amount);
    }

    Ok(amounts)
}

/// Request fields after trimming and validation.
struct ValidRequest {
    counterparty_id: Option<CounterpartyId>,
    category_id: Option<CategoryId>,
    description: String,
    amount: Money,
    issue_date: Date,
    due_date: Date,
    notes: Option<String>,
}

fn validate_request(
    user_id: UserID,
    direction: Direction,
    request: ObligationRequest,
    today: Date,
    connection: &Connection,
) -> Result<ValidRequest, Error> {
    let description = required_text(&request.description, "description")?;
    let amount = request.amount.ensure_positive("amount")?;
    let issue_date = request.issue_date.unwrap_or(today);

    if request.due_date < issue_date {
        return Err(Error::Validation(format!(
            "due_date {} cannot be before issue_date {issue_date}",
            request.due_date
        )));
    }

    if let Some(counterparty_id) = request.counterparty_id {
        ensure_counterparty(
            user_id,
            direction.counterparty_kind(),
            counterparty_id,
            connection,
        )?;
    }

    let category_id = request
        .category_id
        .map(|category_id| {
            resolve_category(
                user_id,
                Some(category_id),
                direction.transaction_kind(),
                connection,
            )
        })
        .transpose()?;

    Ok(ValidRequest {
        counterparty_id: request.counterparty_id,
        category_id,
        description,
        amount,
        issue_date,
        due_date: request.due_date,
        notes: optional_text(request.notes),
    })
}

/// Create a receivable or payable.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] for an empty description, a non-positive amount, or a due date before
///   the issue date,
/// - [Error::InvalidCounterparty] if the counterparty is not a customer of the user for a
///   receivable, or a supplier for a payable,
/// - [Error::InvalidCategory] or [Error::CategoryKindMismatch] for a bad category.
pub fn create_obligation(
    user_id: UserID,
    direction: Direction,
    request: ObligationRequest,
    today: Date,
    connection: &Connection,
) -> Result<Obligation, Error> {
    let request = validate_request(user_id, direction, request, today, connection)?;

    let row = connection
        .prepare(&format!(
            "INSERT INTO obligation (user_id, direction, counterparty_id, category_id, \
            description, amount, issue_date, due_date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING {OBLIGATION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                direction,
                request.counterparty_id,
                request.category_id,
                request.description,
                request.amount,
                request.issue_date,
                request.due_date,
                request.notes,
                OffsetDateTime::now_utc(),
            ],
            map_row,
        )?;

    Ok(row.settle(&[], today))
}

/// Get a receivable or payable of `user_id` with its settlement as of `today`.
pub fn get_obligation(
    user_id: UserID,
    direction: Direction,
    obligation_id: ObligationId,
    today: Date,
    connection: &Connection,
) -> Result<Obligation, Error> {
    let row = connection
        .prepare(&format!(
            "SELECT {OBLIGATION_COLUMNS} FROM obligation
            WHERE id = ?1 AND user_id = ?2 AND direction = ?3"
        ))?
        .query_row((obligation_id, user_id.as_i64(), direction), map_row)?;

    let payments = get_payment_amounts(user_id, direction, Some(obligation_id), connection)?;

    let amounts = payments.get(&obligation_id).map_or(&[][..], Vec::as_slice);

    Ok(row.settle(amounts, today))
}

/// Get the user's receivables or payables matching `query`, ordered by due date.
pub fn get_obligations(
    user_id: UserID,
    direction: Direction,
    query: &ObligationQuery,
    today: Date,
    connection: &Connection,
) -> Result<Vec<Obligation>, Error> {
    let mut conditions = vec!["user_id = ?", "direction = ?"];
    let mut params = vec![
        Value::Integer(user_id.as_i64()),
        Value::Text(direction.as_str().to_owned()),
    ];

    if let Some(counterparty_id) = query.counterparty_id {
        conditions.push("counterparty_id = ?");
        params.push(Value::Integer(counterparty_id));
    }

    if let Some(from) = query.from {
        conditions.push("due_date >= ?");
        params.push(Value::Text(from.to_string()));
    }

    if let Some(to) = query.to {
        conditions.push("due_date <= ?");
        params.push(Value::Text(to.to_string()));
    }

    let rows = connection
        .prepare(&format!(
            "SELECT {OBLIGATION_COLUMNS} FROM obligation WHERE {}
            ORDER BY due_date ASC, id ASC",
            conditions.join(" AND ")
        ))?
        .query_map(params_from_iter(params.iter()), map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let payments = get_payment_amounts(user_id, direction, None, connection)?;

    let obligations = rows
        .into_iter()
        .map(|row| {
            let amounts = payments.get(&row.id).map_or(&[][..], Vec::as_slice);
            row.settle(amounts, today)
        })
        .filter(|obligation| {
            query
                .status
                .is_none_or(|status| obligation.settlement.status == status)
        })
        .filter(|obligation| {
            query
                .overdue
                .is_none_or(|overdue| obligation.settlement.is_overdue == overdue)
        })
        .collect();

    Ok(obligations)
}

/// Replace the fields of a receivable or payable.
///
/// # Errors
/// Returns [Error::AmountBelowPaid] if the new amount is less than what has been paid so far,
/// otherwise the same errors as [create_obligation].
pub fn update_obligation(
    user_id: UserID,
    direction: Direction,
    obligation_id: ObligationId,
    request: ObligationRequest,
    today: Date,
    connection: &Connection,
) -> Result<Obligation, Error> {
    let existing = get_obligation(user_id, direction, obligation_id, today, connection)?;
    let request = validate_request(user_id, direction, request, existing.issue_date, connection)?;

    if request.amount < existing.settlement.paid_amount {
        return Err(Error::AmountBelowPaid {
            paid: existing.settlement.paid_amount,
        });
    }

    connection.execute(
        "UPDATE obligation
        SET counterparty_id = ?1, category_id = ?2, description = ?3, amount = ?4,
            issue_date = ?5, due_date = ?6, notes = ?7
        WHERE id = ?8 AND user_id = ?9",
        rusqlite::params![
            request.counterparty_id,
            request.category_id,
            request.description,
            request.amount,
            request.issue_date,
            request.due_date,
            request.notes,
            obligation_id,
            user_id.as_i64(),
        ],
    )?;

    get_obligation(user_id, direction, obligation_id, today, connection)
}

/// Delete a receivable or payable along with its payments and their ledger transactions.
pub fn delete_obligation(
    user_id: UserID,
    direction: Direction,
    obligation_id: ObligationId,
    connection: &Connection,
) -> Result<(), Error> {
    let found = exists(
        "SELECT 1 FROM obligation WHERE id = ?1 AND user_id = ?2 AND direction = ?3",
        (obligation_id, user_id.as_i64(), direction),
        connection,
    )?;

    if !found {
        return Err(Error::NotFound);
    }

    let transaction_ids = connection
        .prepare(
            "SELECT transaction_id FROM payment
            WHERE obligation_id = ?1 AND transaction_id IS NOT NULL",
        )?
        .query_map([obligation_id], |row| row.get(0))?
        .collect::<Result<Vec<TransactionId>, _>>()?;

    // Payments go with the obligation through the foreign key.
    connection.execute(
        "DELETE FROM obligation WHERE id = ?1 AND user_id = ?2",
        (obligation_id, user_id.as_i64()),
    )?;

    for transaction_id in transaction_ids {
        delete_ledger_transaction(user_id, transaction_id, connection)?;
    }

    Ok(())
}
