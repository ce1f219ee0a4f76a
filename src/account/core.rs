//! Accounts and their balances.
//!
//! An account only stores its opening balance. The current balance is worked out from the
//! transactions recorded against the account whenever it is read.

use std::collections::HashMap;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    db::exists,
    money::Money,
    settings::{get_settings, validate_currency},
    transaction::TransactionKind,
    validation::required_text,
};

pub type AccountId = DatabaseId;

text_enum! {
    /// What kind of place the money is kept in.
    pub enum AccountKind {
        Checking => "checking",
        Savings => "savings",
        Cash => "cash",
        CreditCard => "credit_card",
        Investment => "investment",
        Other => "other",
    }
}

fn default_account_kind() -> AccountKind {
    AccountKind::Checking
}

/// The amount of money available in a bank account, wallet or credit card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: AccountId,
    /// The name of the account, unique per user.
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    /// The balance before any of the recorded transactions.
    pub opening_balance: Money,
    /// The opening balance plus income minus expenses.
    pub balance: Money,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for creating or replacing an account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRequest {
    pub name: String,
    #[serde(default = "default_account_kind")]
    pub kind: AccountKind,
    /// Defaults to the user's currency setting.
    pub currency: Option<String>,
    #[serde(default)]
    pub opening_balance: Money,
}

#[cfg(test)]
impl AccountRequest {
    /// A checking account with no opening balance.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: default_account_kind(),
            currency: None,
            opening_balance: Money::ZERO,
        }
    }
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            currency TEXT NOT NULL,
            opening_balance TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const ACCOUNT_COLUMNS: &str = "id, name, kind, currency, opening_balance, created_at";

/// Map a row to an account whose balance is the opening balance.
///
/// Use [apply_transaction_totals] to fill in the real balance.
fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let opening_balance: Money = row.get(4)?;

    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        currency: row.get(3)?,
        opening_balance,
        balance: opening_balance,
        created_at: row.get(5)?,
    })
}

/// Sum the signed transaction amounts of the user's accounts.
///
/// If `account_id` is given only that account's transactions are read.
fn get_transaction_totals(
    user_id: UserID,
    account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<HashMap<AccountId, Money>, Error> {
    let mut totals: HashMap<AccountId, Money> = HashMap::new();

    let mut statement = connection.prepare(
        "SELECT account_id, kind, amount FROM \"transaction\"
        WHERE user_id = ?1 AND (?2 IS NULL OR account_id = ?2)",
    )?;
    let rows = statement.query_map((user_id.as_i64(), account_id), |row| {
        Ok((
            row.get::<_, AccountId>(0)?,
            row.get::<_, TransactionKind>(1)?,
            row.get::<_, Money>(2)?,
        ))
    })?;

    for row in rows {
        let (account_id, kind, amount) = row?;
        let total = totals.entry(account_id).or_default();
        *total = total.checked_add(kind.signed(amount))?;
    }

    Ok(totals)
}

fn apply_transaction_totals(
    account: &mut Account,
    totals: &HashMap<AccountId, Money>,
) -> Result<(), Error> {
    account.balance = account
        .opening_balance
        .checked_add(totals.get(&account.id).copied().unwrap_or_default())?;

    Ok(())
}

fn map_unique_violation(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, Some(_))
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateAccountName(name.to_owned())
        }
        error => error.into(),
    }
}

fn resolve_currency(
    user_id: UserID,
    currency: Option<String>,
    connection: &Connection,
) -> Result<String, Error> {
    let currency = match currency {
        Some(currency) => currency.trim().to_uppercase(),
        None => get_settings(user_id, connection)?.currency,
    };

    validate_currency(&currency)?;

    Ok(currency)
}

/// Create an account for `user_id`.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] if the name is empty or the currency is malformed,
/// - [Error::DuplicateAccountName] if the user already has an account with the same name,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    user_id: UserID,
    request: AccountRequest,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = required_text(&request.name, "name")?;
    let currency = resolve_currency(user_id, request.currency, connection)?;

    let account = connection
        .prepare(&format!(
            "INSERT INTO account (user_id, name, kind, currency, opening_balance, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING {ACCOUNT_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                &name,
                request.kind,
                &currency,
                request.opening_balance,
                OffsetDateTime::now_utc(),
            ),
            map_row_to_account,
        )
        .map_err(|error| map_unique_violation(error, &name))?;

    Ok(account)
}

/// Get an account of `user_id` along with its current balance.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to another user.
pub fn get_account(
    user_id: UserID,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    let mut account = connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_one((account_id, user_id.as_i64()), map_row_to_account)?;

    let totals = get_transaction_totals(user_id, Some(account_id), connection)?;
    apply_transaction_totals(&mut account, &totals)?;

    Ok(account)
}

/// Get all accounts of `user_id` ordered by name.
pub fn get_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    let mut accounts = connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE user_id = ?1 ORDER BY name COLLATE NOCASE"
        ))?
        .query_map([user_id.as_i64()], map_row_to_account)?
        .collect::<Result<Vec<_>, _>>()?;

    let totals = get_transaction_totals(user_id, None, connection)?;
    for account in &mut accounts {
        apply_transaction_totals(account, &totals)?;
    }

    Ok(accounts)
}

/// Replace the name, kind, currency and opening balance of an account.
pub fn update_account(
    user_id: UserID,
    account_id: AccountId,
    request: AccountRequest,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = required_text(&request.name, "name")?;
    let currency = resolve_currency(user_id, request.currency, connection)?;

    let rows_affected = connection
        .execute(
            "UPDATE account SET name = ?1, kind = ?2, currency = ?3, opening_balance = ?4
            WHERE id = ?5 AND user_id = ?6",
            (
                &name,
                request.kind,
                &currency,
                request.opening_balance,
                account_id,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| map_unique_violation(error, &name))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_account(user_id, account_id, connection)
}

/// Delete an account that has no transactions or fixed accounts.
///
/// # Errors
/// Returns [Error::AccountInUse] if anything still refers to the account.
pub fn delete_account(
    user_id: UserID,
    account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    ensure_account(user_id, account_id, connection).map_err(|error| match error {
        Error::InvalidAccount(_) => Error::NotFound,
        error => error,
    })?;

    let is_in_use = exists(
        "SELECT 1 FROM \"transaction\" WHERE account_id = ?1
        UNION ALL SELECT 1 FROM fixed_account WHERE account_id = ?1",
        [account_id],
        connection,
    )?;

    if is_in_use {
        return Err(Error::AccountInUse);
    }

    connection.execute(
        "DELETE FROM account WHERE id = ?1 AND user_id = ?2",
        (account_id, user_id.as_i64()),
    )?;

    Ok(())
}

/// Check that `account_id` refers to an account of `user_id`.
///
/// # Errors
/// Returns [Error::InvalidAccount] if it does not.
pub fn ensure_account(
    user_id: UserID,
    account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    let found = exists(
        "SELECT 1 FROM account WHERE id = ?1 AND user_id = ?2",
        (account_id, user_id.as_i64()),
        connection,
    )?;

    if found {
        Ok(())
    } else {
        Err(Error::InvalidAccount(account_id))
    }
}

/// Get the total balance across all of the user's accounts.
pub fn get_total_account_balance(user_id: UserID, connection: &Connection) -> Result<Money, Error> {
    Money::checked_sum(
        get_accounts(user_id, connection)?
            .iter()
            .map(|account| account.balance),
    )
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use time::macros::date;

    use crate::{
        Error,
        account::AccountRequest,
        db::test_utils::{must_create_connection_and_user, must_create_test_user},
        money::Money,
        transaction::{Transaction, TransactionKind, create_transaction, delete_transaction},
    };

    use super::{
        AccountKind, create_account, delete_account, ensure_account, get_account, get_accounts,
        get_total_account_balance, update_account,
    };

    #[test]
    fn create_uses_currency_setting_by_default() {
        let (connection, user_id) = must_create_connection_and_user();

        let account = create_account(
            user_id,
            AccountRequest {
                opening_balance: Money::from_cents(10_000),
                ..AccountRequest::named("  Wallet ")
            },
            &connection,
        )
        .unwrap();

        assert_eq!(account.name, "Wallet");
        assert_eq!(account.currency, "BRL");
        assert_eq!(account.balance, Money::from_cents(10_000));
    }

    #[test]
    fn create_fails_on_duplicate_name() {
        let (connection, user_id) = must_create_connection_and_user();
        create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();

        let result = create_account(user_id, AccountRequest::named("Wallet"), &connection);

        assert_eq!(result, Err(Error::DuplicateAccountName("Wallet".to_owned())));
    }

    #[test]
    fn different_users_can_share_a_name() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);
        create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();

        let result = create_account(other_user, AccountRequest::named("Wallet"), &connection);

        assert!(result.is_ok());
    }

    #[test]
    fn balance_follows_transactions() {
        let (connection, user_id) = must_create_connection_and_user();
        let account = create_account(
            user_id,
            AccountRequest {
                opening_balance: Money::from_cents(10_000),
                ..AccountRequest::named("Checking")
            },
            &connection,
        )
        .unwrap();
        let date = date!(2025 - 05 - 01);
        create_transaction(
            user_id,
            Transaction::build(
                account.id,
                TransactionKind::Income,
                Money::from_cents(2_550),
                date,
                "",
            ),
            &connection,
        )
        .unwrap();
        let expense = create_transaction(
            user_id,
            Transaction::build(
                account.id,
                TransactionKind::Expense,
                Money::from_cents(1_025),
                date,
                "",
            ),
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_account(user_id, account.id, &connection).unwrap().balance,
            Money::from_cents(11_525)
        );

        delete_transaction(user_id, expense.id, &connection).unwrap();

        assert_eq!(
            get_account(user_id, account.id, &connection).unwrap().balance,
            Money::from_cents(12_550)
        );
    }

    #[test]
    fn list_is_ordered_by_name_and_total_sums_balances() {
        let (connection, user_id) = must_create_connection_and_user();
        for (name, cents) in [("b", 100), ("A", 250), ("c", -50)] {
            create_account(
                user_id,
                AccountRequest {
                    opening_balance: Money::from_cents(cents),
                    ..AccountRequest::named(name)
                },
                &connection,
            )
            .unwrap();
        }

        let names: Vec<String> = get_accounts(user_id, &connection)
            .unwrap()
            .into_iter()
            .map(|account| account.name)
            .collect();

        assert_eq!(names, vec!["A", "b", "c"]);
        assert_eq!(
            get_total_account_balance(user_id, &connection),
            Ok(Money::from_cents(300))
        );
    }

    #[test]
    fn update_replaces_fields() {
        let (connection, user_id) = must_create_connection_and_user();
        let account =
            create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();

        let updated = update_account(
            user_id,
            account.id,
            AccountRequest {
                name: "Card".to_owned(),
                kind: AccountKind::CreditCard,
                currency: Some("usd".to_owned()),
                opening_balance: Money::from_cents(-500),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name, "Card");
        assert_eq!(updated.kind, AccountKind::CreditCard);
        assert_eq!(updated.currency, "USD");
        assert_eq!(updated.balance, Money::from_cents(-500));
    }

    #[test]
    fn update_missing_account_is_not_found() {
        let (connection, user_id) = must_create_connection_and_user();

        let result = update_account(user_id, 42, AccountRequest::named("Card"), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_fails_when_account_has_transactions() {
        let (connection, user_id) = must_create_connection_and_user();
        let account =
            create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();
        create_transaction(
            user_id,
            Transaction::build(
                account.id,
                TransactionKind::Income,
                Money::from_cents(100),
                date!(2025 - 05 - 01),
                "",
            ),
            &connection,
        )
        .unwrap();

        assert_eq!(
            delete_account(user_id, account.id, &connection),
            Err(Error::AccountInUse)
        );
    }

    #[test]
    fn delete_removes_unused_account() {
        let (connection, user_id) = must_create_connection_and_user();
        let account =
            create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();

        delete_account(user_id, account.id, &connection).unwrap();

        assert_eq!(
            ensure_account(user_id, account.id, &connection),
            Err(Error::InvalidAccount(account.id))
        );
        assert_eq!(
            delete_account(user_id, account.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_reports_database_errors() {
        let (connection, user_id) = must_create_connection_and_user();
        connection.execute("DROP TABLE account", ()).unwrap();

        let result = delete_account(user_id, 1, &connection);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn huge_amounts_never_reach_the_balance() {
        let (connection, user_id) = must_create_connection_and_user();
        let account =
            create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();
        let huge = Money::from_str("50000000000000000000000000000").unwrap();

        for _ in 0..2 {
            let result = create_transaction(
                user_id,
                Transaction::build(
                    account.id,
                    TransactionKind::Income,
                    huge,
                    date!(2025 - 05 - 01),
                    "",
                ),
                &connection,
            );

            assert!(matches!(result, Err(Error::Validation(_))));
        }
        assert_eq!(
            get_account(user_id, account.id, &connection).unwrap().balance,
            Money::ZERO
        );
    }
}
