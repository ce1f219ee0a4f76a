//! Defines the endpoints for listing and fetching transactions.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    pagination::Paginated,
    transaction::{
        Transaction, TransactionId, TransactionQuery, TransactionState, get_transaction,
        get_transactions_page,
    },
};

/// A route handler for a filtered page of the user's transactions.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Paginated<Transaction>>, Error> {
    let page = state
        .pagination_config
        .page_request(query.page, query.per_page);
    let connection = lock_connection(&state.db_connection)?;

    get_transactions_page(user_id, &query, page, &connection).map(Json)
}

/// A route handler for a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(user_id, transaction_id, &connection).map(Json)
}
