//! Defines the endpoint for updating an account.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    account::{Account, AccountId, AccountRequest, AccountState, update_account},
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
};

/// A route handler for replacing the details of an account.
pub async fn update_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<AccountRequest>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let account = update_account(user_id, account_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Update,
        "account",
        Some(account.id),
        Some(&account.name),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(account))
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::put};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        account::{AccountRequest, create_account, update_account_endpoint},
        db::test_utils::must_create_connection_and_user,
        endpoints::{self, format_endpoint},
        test_utils::{state_with_connection, with_user},
    };

    #[tokio::test]
    async fn updates_account() {
        let (connection, user_id) = must_create_connection_and_user();
        let account =
            create_account(user_id, AccountRequest::named("Wallet"), &connection).unwrap();
        let app = Router::new()
            .route(endpoints::ACCOUNT, put(update_account_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();

        let response = server
            .put(&format_endpoint(endpoints::ACCOUNT, account.id))
            .json(&json!({
                "name": "Savings",
                "kind": "savings",
                "currency": "EUR",
                "opening_balance": "1000",
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["name"], "Savings");
        assert_eq!(body["currency"], "EUR");
        assert_eq!(body["balance"], "1000");
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let (connection, user_id) = must_create_connection_and_user();
        let app = Router::new()
            .route(endpoints::ACCOUNT, put(update_account_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();

        server
            .put(&format_endpoint(endpoints::ACCOUNT, 123))
            .json(&json!({ "name": "Savings" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
