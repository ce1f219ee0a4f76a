//! Defines the core data models and database queries for ledger transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{AccountId, ensure_account},
    auth::UserID,
    category::{CategoryId, resolve_category},
    database_id::DatabaseId,
    money::Money,
};

pub type TransactionId = DatabaseId;

// ============================================================================
// MODELS
// ============================================================================

text_enum! {
    /// Whether money came in or went out.
    pub enum TransactionKind {
        Income => "income",
        Expense => "expense",
    }
}

impl TransactionKind {
    /// Apply the sign of this kind to a positive `amount`.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        }
    }
}

text_enum! {
    /// What created a transaction.
    ///
    /// Only manual transactions may be edited directly, the others are owned by the record that
    /// created them.
    pub enum TransactionSource {
        Manual => "manual",
        Transfer => "transfer",
        Payment => "payment",
        FixedAccount => "fixed_account",
        Financing => "financing",
        Investment => "investment",
    }
}

/// An expense or income recorded against an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub category_id: CategoryId,
    pub kind: TransactionKind,
    /// Always positive, the direction comes from `kind`.
    pub amount: Money,
    pub date: Date,
    pub description: String,
    /// Shared by both legs of a transfer.
    pub transfer_id: Option<TransactionId>,
    pub source: TransactionSource,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Money,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            kind,
            amount,
            date,
            description: description.trim().to_owned(),
            category_id: None,
            transfer_id: None,
            source: TransactionSource::Manual,
        }
    }

    /// The amount with the sign given by its kind.
    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }
}

/// A builder for creating [Transaction] instances.
///
/// The category defaults to the user's "Uncategorized" category of the same kind and the source
/// defaults to [TransactionSource::Manual].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub transfer_id: Option<TransactionId>,
    pub source: TransactionSource,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set what created the transaction.
    pub fn source(mut self, source: TransactionSource) -> Self {
        self.source = source;
        self
    }

    pub fn transfer_id(mut self, transfer_id: Option<TransactionId>) -> Self {
        self.transfer_id = transfer_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                amount TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                transfer_id INTEGER,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account ON \"transaction\"(account_id)",
        (),
    )?;

    Ok(())
}

pub(crate) const TRANSACTION_COLUMNS: &str = "id, account_id, category_id, kind, amount, date, \
    description, transfer_id, source, created_at";

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        category_id: row.get(2)?,
        kind: row.get(3)?,
        amount: row.get(4)?,
        date: row.get(5)?,
        description: row.get(6)?,
        transfer_id: row.get(7)?,
        source: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Check the builder against the user's accounts and categories and return the category to use.
fn validate_builder(
    user_id: UserID,
    builder: &TransactionBuilder,
    connection: &Connection,
) -> Result<CategoryId, Error> {
    builder.amount.ensure_positive("amount")?;
    ensure_account(user_id, builder.account_id, connection)?;

    resolve_category(user_id, builder.category_id, builder.kind, connection)
}

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is not positive,
/// - [Error::InvalidAccount] if the account does not belong to the user,
/// - [Error::InvalidCategory] or [Error::CategoryKindMismatch] for a bad category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let category_id = validate_builder(user_id, &builder, connection)?;

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, account_id, category_id, kind, amount, date, \
            description, transfer_id, source, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                builder.account_id,
                category_id,
                builder.kind,
                builder.amount,
                builder.date,
                builder.description,
                builder.transfer_id,
                builder.source,
                OffsetDateTime::now_utc(),
            ],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction owned by `user_id` from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction of the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_one((id, user_id.as_i64()), map_transaction_row)?;

    Ok(transaction)
}

/// Replace the fields of a manual transaction.
///
/// # Errors
/// Returns [Error::ManagedTransaction] if the transaction was not created manually, otherwise the
/// same errors as [create_transaction].
pub fn update_transaction(
    user_id: UserID,
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let existing = get_transaction(user_id, id, connection)?;

    if existing.source != TransactionSource::Manual {
        return Err(Error::ManagedTransaction(existing.source));
    }

    let category_id = validate_builder(user_id, &builder, connection)?;

    let transaction = connection
        .prepare(&format!(
            "UPDATE \"transaction\" SET account_id = ?1, category_id = ?2, kind = ?3, amount = ?4, \
            date = ?5, description = ?6
            WHERE id = ?7 AND user_id = ?8
            RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                builder.account_id,
                category_id,
                builder.kind,
                builder.amount,
                builder.date,
                builder.description,
                id,
                user_id.as_i64(),
            ],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Delete a transaction on behalf of the user.
///
/// Deleting one leg of a transfer deletes both legs. Returns the IDs of the deleted rows.
///
/// # Errors
/// Returns [Error::ManagedTransaction] if the transaction belongs to a payment, fixed account,
/// financing or investment contribution.
pub fn delete_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Vec<TransactionId>, Error> {
    let existing = get_transaction(user_id, id, connection)?;

    match (existing.source, existing.transfer_id) {
        (TransactionSource::Manual, _) => {
            delete_ledger_transaction(user_id, id, connection)?;
            Ok(vec![id])
        }
        (TransactionSource::Transfer, Some(transfer_id)) => {
            let deleted = connection
                .prepare(
                    "DELETE FROM \"transaction\" WHERE transfer_id = ?1 AND user_id = ?2
                    RETURNING id",
                )?
                .query_map((transfer_id, user_id.as_i64()), |row| row.get(0))?
                .collect::<Result<Vec<TransactionId>, _>>()?;

            Ok(deleted)
        }
        (source, _) => Err(Error::ManagedTransaction(source)),
    }
}

/// Delete a transaction regardless of its source.
///
/// Used by the records that own non-manual transactions when they are deleted.
pub(crate) fn delete_ledger_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the total number of transactions in the database across all users.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

// ============================================================================
// TESTS
// ============================================================================
