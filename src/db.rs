//! Database initialisation and shared connection helpers.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, TransactionBehavior, Transaction as SqlTransaction};

use crate::{
    Error,
    account::create_account_table,
    audit::create_audit_log_table,
    auth::{create_user_session_table, create_user_table},
    category::create_category_table,
    counterparty::create_counterparty_table,
    financing::{create_financing_payment_table, create_financing_table},
    fixed_account::{create_fixed_account_payment_table, create_fixed_account_table},
    investment::{
        create_investment_contribution_table, create_investment_goal_table,
        create_investment_table,
    },
    notification::create_notification_table,
    obligation::{create_obligation_table, create_payment_table},
    settings::create_user_setting_table,
    transaction::create_transaction_table,
};

/// Create the tables for every domain model.
///
/// Foreign key enforcement is switched on for `connection` first, since SQLite leaves it off by
/// default and the schema relies on cascading deletes.
///
/// # Errors
/// Returns an error if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_user_session_table(&transaction)?;
    create_user_setting_table(&transaction)?;
    create_audit_log_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_counterparty_table(&transaction)?;
    create_obligation_table(&transaction)?;
    create_payment_table(&transaction)?;
    create_financing_table(&transaction)?;
    create_financing_payment_table(&transaction)?;
    create_investment_table(&transaction)?;
    create_investment_contribution_table(&transaction)?;
    create_investment_goal_table(&transaction)?;
    create_fixed_account_table(&transaction)?;
    create_fixed_account_payment_table(&transaction)?;
    create_notification_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the lock on the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub fn lock_connection(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// Returns true if `query` with `params` returns at least one row.
pub(crate) fn exists<P: rusqlite::Params>(
    query: &str,
    params: P,
    connection: &Connection,
) -> Result<bool, Error> {
    let found = connection
        .prepare(query)?
        .exists(params)
        .map_err(Error::from)?;

    Ok(found)
}
