//! Defines the endpoint for creating a new account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{AccountRequest, create_account},
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
};

/// The state needed by the account endpoints.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new account.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<AccountRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let account = create_account(user_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        "account",
        Some(account.id),
        Some(&account.name),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    tracing::debug!("created account {} for user {user_id}", account.id);

    Ok((StatusCode::CREATED, Json(account)))
}
