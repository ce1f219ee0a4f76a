//! Defines the endpoint for deleting a category.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    auth::UserID,
    category::{CategoryId, CategoryState, delete_category},
    db::lock_connection,
};

/// A route handler for deleting a category. Its transactions move to the default category.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_category(user_id, category_id, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}
