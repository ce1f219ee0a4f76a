//! Payments against receivables and payables.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::AccountId,
    auth::UserID,
    database_id::DatabaseId,
    db::exists,
    money::Money,
    obligation::{Direction, Obligation, ObligationId, get_obligation},
    transaction::{
        Transaction, TransactionId, TransactionSource, create_transaction,
        delete_ledger_transaction,
    },
    validation::optional_text,
};

pub type PaymentId = DatabaseId;

/// A full or partial settlement of a receivable or payable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub obligation_id: ObligationId,
    pub amount: Money,
    pub date: Date,
    /// The account the money moved through, if it was recorded in the ledger.
    pub account_id: Option<AccountId>,
    pub transaction_id: Option<TransactionId>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for recording a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub date: Date,
    /// When set, the payment is also written to the ledger on this account.
    pub account_id: Option<AccountId>,
    pub notes: Option<String>,
}

/// A new payment and the obligation it was applied to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub obligation: Obligation,
}

pub fn create_payment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS payment (
            id INTEGER PRIMARY KEY,
            obligation_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            account_id INTEGER,
            transaction_id INTEGER,
            notes TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(obligation_id) REFERENCES obligation(id) ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id)
        );

        CREATE INDEX IF NOT EXISTS idx_payment_obligation ON payment(obligation_id);",
    )?;

    Ok(())
}

const PAYMENT_COLUMNS: &str =
    "id, obligation_id, amount, date, account_id, transaction_id, notes, created_at";

/// The payment columns for queries that join on the obligation table.
const QUALIFIED_PAYMENT_COLUMNS: &str = "payment.id, payment.obligation_id, payment.amount, \
    payment.date, payment.account_id, payment.transaction_id, payment.notes, payment.created_at";

fn map_row(row: &Row) -> Result<Payment, rusqlite::Error> {
    Ok(Payment {
        id: row.get(0)?,
        obligation_id: row.get(1)?,
        amount: row.get(2)?,
        date: row.get(3)?,
        account_id: row.get(4)?,
        transaction_id: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Record a payment against a receivable or payable.
///
/// With an `account_id` an income (receivable) or expense (payable) transaction is written to
/// the ledger as well. Callers should run this inside a SQL transaction so that the payment and
/// its ledger transaction are saved together.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the obligation does not exist,
/// - [Error::Validation] if the amount is not positive,
/// - [Error::Overpayment] if the amount is more than what remains,
/// - the errors of [create_transaction] for the ledger transaction.
pub fn create_payment(
    user_id: UserID,
    direction: Direction,
    obligation_id: ObligationId,
    request: PaymentRequest,
    today: Date,
    connection: &Connection,
) -> Result<PaymentReceipt, Error> {
    let obligation = get_obligation(user_id, direction, obligation_id, today, connection)?;
    let amount = request.amount.ensure_positive("amount")?;

    let remaining = obligation.settlement.remaining_amount;
    if amount > remaining {
        return Err(Error::Overpayment { remaining });
    }

    let transaction_id = match request.account_id {
        Some(account_id) => {
            let transaction = create_transaction(
                user_id,
                Transaction::build(
                    account_id,
                    direction.transaction_kind(),
                    amount,
                    request.date,
                    &obligation.description,
                )
                .category_id(obligation.category_id)
                .source(TransactionSource::Payment),
                connection,
            )?;
            Some(transaction.id)
        }
        None => None,
    };

    let payment = connection
        .prepare(&format!(
            "INSERT INTO payment (obligation_id, amount, date, account_id, transaction_id, \
            notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING {PAYMENT_COLUMNS}"
        ))?
        .query_row(
            (
                obligation_id,
                amount,
                request.date,
                request.account_id,
                transaction_id,
                optional_text(request.notes),
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )?;

    let obligation = get_obligation(user_id, direction, obligation_id, today, connection)?;

    Ok(PaymentReceipt {
        payment,
        obligation,
    })
}

/// Get the payments of a receivable or payable, oldest first.
pub fn get_payments(
    user_id: UserID,
    direction: Direction,
    obligation_id: ObligationId,
    connection: &Connection,
) -> Result<Vec<Payment>, Error> {
    let found = exists(
        "SELECT 1 FROM obligation WHERE id = ?1 AND user_id = ?2 AND direction = ?3",
        (obligation_id, user_id.as_i64(), direction),
        connection,
    )?;

    if !found {
        return Err(Error::NotFound);
    }

    connection
        .prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment WHERE obligation_id = ?1
            ORDER BY date ASC, id ASC"
        ))?
        .query_map([obligation_id], map_row)?
        .map(|payment| payment.map_err(Error::from))
        .collect()
}

/// Delete a payment and its ledger transaction, returning the deleted payment.
pub fn delete_payment(
    user_id: UserID,
    payment_id: PaymentId,
    connection: &Connection,
) -> Result<Payment, Error> {
    let payment = connection
        .prepare(&format!(
            "SELECT {QUALIFIED_PAYMENT_COLUMNS} FROM payment
            INNER JOIN obligation ON obligation.id = payment.obligation_id
            WHERE payment.id = ?1 AND obligation.user_id = ?2"
        ))?
        .query_row((payment_id, user_id.as_i64()), map_row)?;

    connection.execute("DELETE FROM payment WHERE id = ?1", [payment_id])?;

    if let Some(transaction_id) = payment.transaction_id {
        delete_ledger_transaction(user_id, transaction_id, connection)?;
    }

    Ok(payment)
}
