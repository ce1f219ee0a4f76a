//! Recurring bills such as rent, subscriptions and insurance.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::{
    Error,
    account::{AccountId, ensure_account},
    auth::UserID,
    category::{CategoryId, resolve_category},
    database_id::DatabaseId,
    fixed_account::{
        Frequency, PaidOccurrence, get_paid_transaction_ids, next_occurrence, occurrences_until,
        record_paid_occurrence,
    },
    money::Money,
    transaction::{
        Transaction, TransactionKind, TransactionSource, create_transaction,
        delete_ledger_transaction,
    },
    validation::required_text,
};

pub type FixedAccountId = DatabaseId;

/// The longest window accepted by [upcoming_occurrences].
pub const MAX_UPCOMING_DAYS: u32 = 365;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedAccount {
    pub id: FixedAccountId,
    pub description: String,
    pub amount: Money,
    pub frequency: Frequency,
    /// The first due date, later occurrences are counted from it.
    pub start_date: Date,
    /// The earliest unpaid occurrence.
    pub next_due_date: Date,
    /// The last day an occurrence may fall on.
    pub end_date: Option<Date>,
    pub account_id: AccountId,
    pub category_id: CategoryId,
    /// Inactive fixed accounts are not shown as upcoming and cannot be paid.
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for creating or replacing a fixed account.
#[derive(Debug, Clone, Deserialize)]
pub struct FixedAccountRequest {
    pub description: String,
    pub amount: Money,
    pub frequency: Frequency,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub account_id: AccountId,
    /// Defaults to the "Uncategorized" expense category.
    pub category_id: Option<CategoryId>,
    /// Defaults to true.
    pub active: Option<bool>,
}

/// The request body for paying the current occurrence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayFixedAccountRequest {
    /// Defaults to the user's current date.
    pub date: Option<Date>,
    /// Defaults to the fixed account's amount.
    pub amount: Option<Money>,
}

/// The expense written for a payment and the fixed account after it moved on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedAccountPayment {
    pub payment: PaidOccurrence,
    pub transaction: Transaction,
    pub fixed_account: FixedAccount,
}

/// One expected payment of a fixed account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingOccurrence {
    pub fixed_account_id: FixedAccountId,
    pub description: String,
    pub amount: Money,
    pub due_date: Date,
    pub is_overdue: bool,
}

pub fn create_fixed_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS fixed_account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            frequency TEXT NOT NULL,
            start_date TEXT NOT NULL,
            next_due_date TEXT NOT NULL,
            end_date TEXT,
            account_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id),
            FOREIGN KEY(category_id) REFERENCES category(id)
        )",
        (),
    )?;

    Ok(())
}

const COLUMNS: &str = "id, description, amount, frequency, start_date, next_due_date, end_date, \
    account_id, category_id, active, created_at";

fn map_row(row: &Row) -> Result<FixedAccount, rusqlite::Error> {
    Ok(FixedAccount {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        frequency: row.get(3)?,
        start_date: row.get(4)?,
        next_due_date: row.get(5)?,
        end_date: row.get(6)?,
        account_id: row.get(7)?,
        category_id: row.get(8)?,
        active: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// A validated [FixedAccountRequest].
struct ValidRequest {
    description: String,
    amount: Money,
    category_id: CategoryId,
}

fn validate_request(
    user_id: UserID,
    request: &FixedAccountRequest,
    connection: &Connection,
) -> Result<ValidRequest, Error> {
    let description = required_text(&request.description, "description")?;
    let amount = request.amount.ensure_positive("amount")?;

    if request
        .end_date
        .is_some_and(|end_date| end_date < request.start_date)
    {
        return Err(Error::Validation(
            "end_date cannot be before start_date".to_owned(),
        ));
    }

    ensure_account(user_id, request.account_id, connection)?;
    let category_id = resolve_category(
        user_id,
        request.category_id,
        TransactionKind::Expense,
        connection,
    )?;

    Ok(ValidRequest {
        description,
        amount,
        category_id,
    })
}

/// Whether a fixed account with `next_due_date` still has occurrences to pay.
fn has_remaining_occurrences(next_due_date: Date, end_date: Option<Date>) -> bool {
    end_date.is_none_or(|end_date| next_due_date <= end_date)
}

/// Create a fixed account whose first occurrence is its start date.
pub fn create_fixed_account(
    user_id: UserID,
    request: FixedAccountRequest,
    connection: &Connection,
) -> Result<FixedAccount, Error> {
    let valid = validate_request(user_id, &request, connection)?;

    connection
        .prepare(&format!(
            "INSERT INTO fixed_account (user_id, description, amount, frequency, start_date, \
            next_due_date, end_date, account_id, category_id, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING {COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                valid.description,
                valid.amount,
                request.frequency,
                request.start_date,
                request.end_date,
                request.account_id,
                valid.category_id,
                request.active.unwrap_or(true),
                OffsetDateTime::now_utc(),
            ],
            map_row,
        )
        .map_err(Error::from)
}

pub fn get_fixed_account(
    user_id: UserID,
    fixed_account_id: FixedAccountId,
    connection: &Connection,
) -> Result<FixedAccount, Error> {
    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM fixed_account WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((fixed_account_id, user_id.as_i64()), map_row)
        .map_err(Error::from)
}

/// Get the user's fixed accounts, those due soonest first.
pub fn get_fixed_accounts(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<FixedAccount>, Error> {
    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM fixed_account WHERE user_id = ?1
            ORDER BY active DESC, next_due_date ASC, id ASC"
        ))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|fixed_account| fixed_account.map_err(Error::from))
        .collect()
}

/// Replace a fixed account.
///
/// Changing the start date or frequency restarts the schedule at the new start date.
pub fn update_fixed_account(
    user_id: UserID,
    fixed_account_id: FixedAccountId,
    request: FixedAccountRequest,
    connection: &Connection,
) -> Result<FixedAccount, Error> {
    let existing = get_fixed_account(user_id, fixed_account_id, connection)?;
    let valid = validate_request(user_id, &request, connection)?;

    let next_due_date = if existing.start_date != request.start_date
        || existing.frequency != request.frequency
    {
        request.start_date
    } else {
        existing.next_due_date
    };
    let active = request.active.unwrap_or(existing.active)
        && has_remaining_occurrences(next_due_date, request.end_date);

    connection
        .prepare(&format!(
            "UPDATE fixed_account SET description = ?1, amount = ?2, frequency = ?3,
                start_date = ?4, next_due_date = ?5, end_date = ?6, account_id = ?7,
                category_id = ?8, active = ?9
            WHERE id = ?10 AND user_id = ?11
            RETURNING {COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                valid.description,
                valid.amount,
                request.frequency,
                request.start_date,
                next_due_date,
                request.end_date,
                request.account_id,
                valid.category_id,
                active,
                fixed_account_id,
                user_id.as_i64(),
            ],
            map_row,
        )
        .map_err(Error::from)
}

/// Delete a fixed account along with the expenses its payments wrote.
///
/// Callers should run this inside a SQL transaction.
pub fn delete_fixed_account(
    user_id: UserID,
    fixed_account_id: FixedAccountId,
    connection: &Connection,
) -> Result<(), Error> {
    get_fixed_account(user_id, fixed_account_id, connection)?;
    let transaction_ids = get_paid_transaction_ids(fixed_account_id, connection)?;

    connection.execute(
        "DELETE FROM fixed_account WHERE id = ?1 AND user_id = ?2",
        (fixed_account_id, user_id.as_i64()),
    )?;

    for transaction_id in transaction_ids {
        delete_ledger_transaction(user_id, transaction_id, connection)?;
    }

    Ok(())
}

/// Move the schedule of a fixed account to `next_due_date`.
///
/// The fixed account is active exactly when `next_due_date` is not after its end date.
pub(crate) fn set_next_due_date(
    user_id: UserID,
    fixed_account_id: FixedAccountId,
    next_due_date: Date,
    connection: &Connection,
) -> Result<FixedAccount, Error> {
    connection
        .prepare(&format!(
            "UPDATE fixed_account SET next_due_date = ?1, active = (end_date IS NULL OR ?1 <= end_date)
            WHERE id = ?2 AND user_id = ?3
            RETURNING {COLUMNS}"
        ))?
        .query_row(
            (next_due_date, fixed_account_id, user_id.as_i64()),
            map_row,
        )
        .map_err(Error::from)
}

/// Pay the occurrence due on `next_due_date`.
///
/// Writes an expense on the fixed account's account, records the paid occurrence and moves
/// `next_due_date` on to the following occurrence. The fixed account is deactivated once that
/// falls after its end date. Callers should run this inside a SQL transaction.
///
/// # Errors
/// Returns [Error::InactiveFixedAccount] if the fixed account is not active.
pub fn pay_fixed_account(
    user_id: UserID,
    fixed_account_id: FixedAccountId,
    request: PayFixedAccountRequest,
    today: Date,
    connection: &Connection,
) -> Result<FixedAccountPayment, Error> {
    let fixed_account = get_fixed_account(user_id, fixed_account_id, connection)?;

    if !fixed_account.active {
        return Err(Error::InactiveFixedAccount);
    }

    let amount = request
        .amount
        .unwrap_or(fixed_account.amount)
        .ensure_positive("amount")?;

    let transaction = create_transaction(
        user_id,
        Transaction::build(
            fixed_account.account_id,
            TransactionKind::Expense,
            amount,
            request.date.unwrap_or(today),
            &fixed_account.description,
        )
        .category_id(Some(fixed_account.category_id))
        .source(TransactionSource::FixedAccount),
        connection,
    )?;

    let payment = record_paid_occurrence(
        fixed_account_id,
        fixed_account.next_due_date,
        transaction.id,
        connection,
    )?;

    let next_due_date = next_occurrence(
        fixed_account.start_date,
        fixed_account.frequency,
        fixed_account.next_due_date,
    )?;
    let fixed_account = set_next_due_date(user_id, fixed_account_id, next_due_date, connection)?;

    if !fixed_account.active {
        tracing::info!(
            "fixed account {fixed_account_id} paid its last occurrence and is now inactive"
        );
    }

    Ok(FixedAccountPayment {
        payment,
        transaction,
        fixed_account,
    })
}

/// The occurrences of active fixed accounts that are overdue or due within `days` of `today`,
/// earliest first.
pub fn upcoming_occurrences(
    user_id: UserID,
    days: u32,
    today: Date,
    connection: &Connection,
) -> Result<Vec<UpcomingOccurrence>, Error> {
    if days > MAX_UPCOMING_DAYS {
        return Err(Error::Validation(format!(
            "days must be between 0 and {MAX_UPCOMING_DAYS}"
        )));
    }

    let window_end = today + Duration::days(i64::from(days));
    let mut occurrences = Vec::new();

    for fixed_account in get_fixed_accounts(user_id, connection)?
        .into_iter()
        .filter(|fixed_account| fixed_account.active)
    {
        let until = match fixed_account.end_date {
            Some(end_date) => end_date.min(window_end),
            None => window_end,
        };

        for due_date in occurrences_until(
            fixed_account.start_date,
            fixed_account.frequency,
            fixed_account.next_due_date,
            until,
        )? {
            occurrences.push(UpcomingOccurrence {
                fixed_account_id: fixed_account.id,
                description: fixed_account.description.clone(),
                amount: fixed_account.amount,
                due_date,
                is_overdue: due_date < today,
            });
        }
    }

    occurrences.sort_by_key(|occurrence| (occurrence.due_date, occurrence.fixed_account_id));

    Ok(occurrences)
}
