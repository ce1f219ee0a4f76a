//! Defines the endpoints for listing and fetching accounts.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    account::{Account, AccountId, AccountState, get_account, get_accounts},
    auth::UserID,
    db::lock_connection,
};

/// A route handler for all of the user's accounts with their current balances.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_accounts(user_id, &connection).map(Json)
}

/// A route handler for a single account.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account(user_id, account_id, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::{
        account::{AccountRequest, create_account, get_account_endpoint, list_accounts_endpoint},
        db::test_utils::{must_create_connection_and_user, must_create_test_user},
        endpoints::{self, format_endpoint},
        test_utils::{state_with_connection, with_user},
    };

    #[tokio::test]
    async fn lists_only_own_accounts() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);
        create_account(user_id, AccountRequest::named("Mine"), &connection).unwrap();
        create_account(other_user, AccountRequest::named("Theirs"), &connection).unwrap();
        let app = Router::new()
            .route(endpoints::ACCOUNTS, get(list_accounts_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();

        let response = server.get(endpoints::ACCOUNTS).await;

        response.assert_status_ok();
        let body: Value = response.json();
        let accounts = body.as_array().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0]["name"], "Mine");
    }

    #[tokio::test]
    async fn other_users_account_is_not_found() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);
        let account =
            create_account(other_user, AccountRequest::named("Theirs"), &connection).unwrap();
        let app = Router::new()
            .route(endpoints::ACCOUNT, get(get_account_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();

        server
            .get(&format_endpoint(endpoints::ACCOUNT, account.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
