//! Defines the endpoint for deleting an account.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    account::{AccountId, AccountState, delete_account},
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
};

/// A route handler for deleting an account that has no transactions.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_account(user_id, account_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        "account",
        Some(account_id),
        None,
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::delete};
    use axum_test::TestServer;
    use time::macros::date;

    use crate::{
        account::{AccountRequest, create_account, delete_account_endpoint},
        db::test_utils::must_create_connection_and_user,
        endpoints::{self, format_endpoint},
        money::Money,
        test_utils::{assert_error, state_with_connection, with_user},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    #[tokio::test]
    async fn deletes_unused_account() {
        let (connection, user_id) = must_create_connection_and_user();
        let account =
            create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();
        let app = Router::new()
            .route(endpoints::ACCOUNT, delete(delete_account_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();
        let path = format_endpoint(endpoints::ACCOUNT, account.id);

        server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
        server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn account_with_transactions_is_conflict() {
        let (connection, user_id) = must_create_connection_and_user();
        let account =
            create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();
        create_transaction(
            user_id,
            Transaction::build(
                account.id,
                TransactionKind::Expense,
                Money::from_cents(500),
                date!(2025 - 04 - 01),
                "Coffee",
            ),
            &connection,
        )
        .unwrap();
        let app = Router::new()
            .route(endpoints::ACCOUNT, delete(delete_account_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();

        let response = server
            .delete(&format_endpoint(endpoints::ACCOUNT, account.id))
            .await;

        assert_error(
            &response,
            StatusCode::CONFLICT,
            "the account has transactions and cannot be deleted",
        );
    }
}
