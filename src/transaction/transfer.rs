//! Moving money between two of the user's accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    account::AccountId,
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
    money::Money,
    transaction::{Transaction, TransactionKind, TransactionSource, create_transaction},
    validation::optional_text,
};

const DEFAULT_TRANSFER_DESCRIPTION: &str = "Transfer";

/// The request body for a transfer.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Money,
    pub date: Date,
    pub description: Option<String>,
}

/// The two legs of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    /// The expense on the source account.
    pub outgoing: Transaction,
    /// The income on the destination account.
    pub incoming: Transaction,
}

/// Record a transfer as an expense on the source account and an income on the destination.
///
/// Both legs share a `transfer_id`, which is the ID of the outgoing leg.
///
/// # Errors
/// Returns [Error::SameAccountTransfer] if both accounts are the same, otherwise the errors of
/// [create_transaction].
pub fn create_transfer(
    user_id: UserID,
    request: TransferRequest,
    connection: &Connection,
) -> Result<Transfer, Error> {
    if request.from_account_id == request.to_account_id {
        return Err(Error::SameAccountTransfer);
    }

    let description = optional_text(request.description)
        .unwrap_or_else(|| DEFAULT_TRANSFER_DESCRIPTION.to_owned());

    let sql_transaction = connection.unchecked_transaction()?;

    let mut outgoing = create_transaction(
        user_id,
        Transaction::build(
            request.from_account_id,
            TransactionKind::Expense,
            request.amount,
            request.date,
            &description,
        )
        .source(TransactionSource::Transfer),
        &sql_transaction,
    )?;

    sql_transaction.execute(
        "UPDATE \"transaction\" SET transfer_id = ?1 WHERE id = ?1",
        [outgoing.id],
    )?;
    outgoing.transfer_id = Some(outgoing.id);

    let incoming = create_transaction(
        user_id,
        Transaction::build(
            request.to_account_id,
            TransactionKind::Income,
            request.amount,
            request.date,
            &description,
        )
        .source(TransactionSource::Transfer)
        .transfer_id(Some(outgoing.id)),
        &sql_transaction,
    )?;

    record(
        user_id,
        AuditAction::Create,
        "transfer",
        Some(outgoing.id),
        Some(&request.amount.to_string()),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(Transfer { outgoing, incoming })
}

/// The state needed for creating transfers.
#[derive(Debug, Clone)]
pub struct TransferState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransferState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for moving money between two accounts.
pub async fn create_transfer_endpoint(
    State(state): State<TransferState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<TransferRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transfer = create_transfer(user_id, request, &connection)?;

    Ok((StatusCode::CREATED, Json(transfer)))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        account::{AccountId, AccountRequest, create_account, get_account},
        auth::UserID,
        db::test_utils::must_create_connection_and_user,
        money::Money,
        transaction::{TransactionKind, count_transactions, delete_transaction},
    };

    use super::{TransferRequest, create_transfer};

    fn must_create_accounts(user_id: UserID, connection: &Connection) -> (AccountId, AccountId) {
        let from = create_account(user_id, AccountRequest::named("Checking"), connection)
            .unwrap()
            .id;
        let to = create_account(user_id, AccountRequest::named("Savings"), connection)
            .unwrap()
            .id;

        (from, to)
    }

    fn transfer_request(from: AccountId, to: AccountId) -> TransferRequest {
        TransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount: Money::from_cents(5000),
            date: date!(2025 - 03 - 01),
            description: None,
        }
    }

    #[test]
    fn creates_linked_legs_and_moves_balance() {
        let (connection, user_id) = must_create_connection_and_user();
        let (from, to) = must_create_accounts(user_id, &connection);

        let transfer = create_transfer(user_id, transfer_request(from, to), &connection).unwrap();

        assert_eq!(transfer.outgoing.kind, TransactionKind::Expense);
        assert_eq!(transfer.incoming.kind, TransactionKind::Income);
        assert_eq!(transfer.outgoing.transfer_id, Some(transfer.outgoing.id));
        assert_eq!(transfer.incoming.transfer_id, Some(transfer.outgoing.id));
        assert_eq!(transfer.outgoing.description, "Transfer");
        assert_eq!(
            get_account(user_id, from, &connection).unwrap().balance,
            Money::from_cents(-5000)
        );
        assert_eq!(
            get_account(user_id, to, &connection).unwrap().balance,
            Money::from_cents(5000)
        );
    }

    #[test]
    fn rejects_same_account() {
        let (connection, user_id) = must_create_connection_and_user();
        let (from, _) = must_create_accounts(user_id, &connection);

        let result = create_transfer(user_id, transfer_request(from, from), &connection);

        assert_eq!(result, Err(Error::SameAccountTransfer));
    }

    #[test]
    fn rolls_back_when_destination_is_invalid() {
        let (connection, user_id) = must_create_connection_and_user();
        let (from, _) = must_create_accounts(user_id, &connection);

        let result = create_transfer(user_id, transfer_request(from, 999), &connection);

        assert_eq!(result, Err(Error::InvalidAccount(999)));
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[test]
    fn deleting_one_leg_deletes_both() {
        let (connection, user_id) = must_create_connection_and_user();
        let (from, to) = must_create_accounts(user_id, &connection);
        let transfer = create_transfer(user_id, transfer_request(from, to), &connection).unwrap();

        let mut deleted = delete_transaction(user_id, transfer.incoming.id, &connection).unwrap();
        deleted.sort();

        assert_eq!(deleted, vec![transfer.outgoing.id, transfer.incoming.id]);
        assert_eq!(count_transactions(&connection), Ok(0));
    }
}
