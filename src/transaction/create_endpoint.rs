//! Defines the endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    account::AccountId,
    audit::{AuditAction, record},
    auth::UserID,
    category::CategoryId,
    db::lock_connection,
    money::Money,
    pagination::PaginationConfig,
    transaction::{Transaction, TransactionBuilder, TransactionKind, create_transaction},
};

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    pub pagination_config: PaginationConfig,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating or replacing a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    pub account_id: AccountId,
    /// Defaults to the "Uncategorized" category of the same kind.
    pub category_id: Option<CategoryId>,
    pub kind: TransactionKind,
    pub amount: Money,
    pub date: Date,
    #[serde(default)]
    pub description: String,
}

impl From<TransactionRequest> for TransactionBuilder {
    fn from(request: TransactionRequest) -> Self {
        Transaction::build(
            request.account_id,
            request.kind,
            request.amount,
            request.date,
            &request.description,
        )
        .category_id(request.category_id)
    }
}

/// A route handler for creating a new manual transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<TransactionRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let transaction = create_transaction(user_id, request.into(), &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        "transaction",
        Some(transaction.id),
        Some(&transaction.signed_amount().to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(transaction)))
}
