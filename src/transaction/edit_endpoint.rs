//! Defines the endpoint for replacing a manual transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
    transaction::{
        Transaction, TransactionId, TransactionRequest, TransactionState, update_transaction,
    },
};

/// A route handler for replacing the fields of a manual transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let transaction =
        update_transaction(user_id, transaction_id, request.into(), &sql_transaction)?;
    record(
        user_id,
        AuditAction::Update,
        "transaction",
        Some(transaction.id),
        Some(&transaction.signed_amount().to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(transaction))
}
