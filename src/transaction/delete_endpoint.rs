//! Defines the endpoint for deleting a transaction.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
    transaction::{TransactionId, TransactionState, delete_transaction},
};

/// A route handler for deleting a transaction. Deleting a transfer leg deletes the other leg too.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    for deleted_id in delete_transaction(user_id, transaction_id, &sql_transaction)? {
        record(
            user_id,
            AuditAction::Delete,
            "transaction",
            Some(deleted_id),
            None,
            &sql_transaction,
        )?;
    }
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::delete};
    use axum_test::TestServer;
    use time::macros::date;

    use crate::{
        account::{AccountRequest, create_account},
        db::test_utils::must_create_connection_and_user,
        endpoints::{self, format_endpoint},
        money::Money,
        test_utils::{state_with_connection, with_user},
        transaction::{Transaction, TransactionKind, create_transaction, delete_transaction_endpoint},
    };

    #[tokio::test]
    async fn deletes_transaction_then_404s() {
        let (connection, user_id) = must_create_connection_and_user();
        let account = create_account(user_id, AccountRequest::named("Checking"), &connection)
            .unwrap();
        let transaction = create_transaction(
            user_id,
            Transaction::build(
                account.id,
                TransactionKind::Expense,
                Money::from_cents(100),
                date!(2025 - 01 - 01),
                "",
            ),
            &connection,
        )
        .unwrap();
        let app = Router::new()
            .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();
        let path = format_endpoint(endpoints::TRANSACTION, transaction.id);

        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
