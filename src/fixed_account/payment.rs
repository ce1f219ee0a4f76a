//! The occurrences of fixed accounts that have been paid.
//!
//! Each payment links the occurrence's due date to the expense written in the ledger, so that a
//! payment can be undone and the expenses removed along with their fixed account.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    fixed_account::{FixedAccount, FixedAccountId, get_fixed_account, set_next_due_date},
    transaction::{TransactionId, delete_ledger_transaction},
};

pub type PaidOccurrenceId = DatabaseId;

/// A paid occurrence of a fixed account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaidOccurrence {
    pub id: PaidOccurrenceId,
    pub fixed_account_id: FixedAccountId,
    /// The due date of the occurrence that was paid.
    pub due_date: Date,
    /// The expense written for the payment.
    pub transaction_id: TransactionId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn create_fixed_account_payment_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS fixed_account_payment (
            id INTEGER PRIMARY KEY,
            fixed_account_id INTEGER NOT NULL,
            due_date TEXT NOT NULL,
            transaction_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(fixed_account_id) REFERENCES fixed_account(id) ON DELETE CASCADE,
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id)
        )",
        (),
    )?;

    Ok(())
}

const COLUMNS: &str = "id, fixed_account_id, due_date, transaction_id, created_at";

fn map_row(row: &Row) -> Result<PaidOccurrence, rusqlite::Error> {
    Ok(PaidOccurrence {
        id: row.get(0)?,
        fixed_account_id: row.get(1)?,
        due_date: row.get(2)?,
        transaction_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Link the occurrence due on `due_date` to the expense that paid it.
pub(crate) fn record_paid_occurrence(
    fixed_account_id: FixedAccountId,
    due_date: Date,
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<PaidOccurrence, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO fixed_account_payment (fixed_account_id, due_date, transaction_id, \
            created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING {COLUMNS}"
        ))?
        .query_row(
            (
                fixed_account_id,
                due_date,
                transaction_id,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )
        .map_err(Error::from)
}

/// The IDs of the expenses written by the payments of a fixed account.
pub(crate) fn get_paid_transaction_ids(
    fixed_account_id: FixedAccountId,
    connection: &Connection,
) -> Result<Vec<TransactionId>, Error> {
    connection
        .prepare("SELECT transaction_id FROM fixed_account_payment WHERE fixed_account_id = ?1")?
        .query_map([fixed_account_id], |row| row.get(0))?
        .map(|transaction_id| transaction_id.map_err(Error::from))
        .collect()
}

/// Get the paid occurrences of a fixed account, latest first.
pub fn get_fixed_account_payments(
    user_id: UserID,
    fixed_account_id: FixedAccountId,
    connection: &Connection,
) -> Result<Vec<PaidOccurrence>, Error> {
    get_fixed_account(user_id, fixed_account_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM fixed_account_payment WHERE fixed_account_id = ?1
            ORDER BY due_date DESC, id DESC"
        ))?
        .query_map([fixed_account_id], map_row)?
        .map(|payment| payment.map_err(Error::from))
        .collect()
}

/// Undo the latest payment of a fixed account.
///
/// Deletes the expense it wrote and moves `next_due_date` back to the occurrence it paid, which
/// also reactivates a fixed account that had paid its last occurrence. Callers should run this
/// inside a SQL transaction.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the payment does not exist or belongs to another user,
/// - [Error::NotLatestFixedAccountPayment] if a later occurrence has been paid since.
pub fn delete_fixed_account_payment(
    user_id: UserID,
    payment_id: PaidOccurrenceId,
    connection: &Connection,
) -> Result<(PaidOccurrence, FixedAccount), Error> {
    let payment = connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM fixed_account_payment
            WHERE id = ?1
                AND fixed_account_id IN (SELECT id FROM fixed_account WHERE user_id = ?2)"
        ))?
        .query_row((payment_id, user_id.as_i64()), map_row)?;

    let latest_id: PaidOccurrenceId = connection.query_row(
        "SELECT id FROM fixed_account_payment WHERE fixed_account_id = ?1
        ORDER BY due_date DESC, id DESC LIMIT 1",
        [payment.fixed_account_id],
        |row| row.get(0),
    )?;

    if latest_id != payment.id {
        return Err(Error::NotLatestFixedAccountPayment);
    }

    connection.execute("DELETE FROM fixed_account_payment WHERE id = ?1", [payment.id])?;
    delete_ledger_transaction(user_id, payment.transaction_id, connection)?;

    let fixed_account =
        set_next_due_date(user_id, payment.fixed_account_id, payment.due_date, connection)?;

    tracing::debug!(
        "undid the payment due {} of fixed account {}",
        payment.due_date,
        payment.fixed_account_id
    );

    Ok((payment, fixed_account))
}
