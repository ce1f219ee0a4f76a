//! Defines the endpoint for updating a category.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryId, CategoryRequest, CategoryState, update_category},
    db::lock_connection,
};

/// A route handler for renaming a category.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_category(user_id, category_id, request, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::put};
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        category::{CategoryKind, default_category, update_category_endpoint},
        db::test_utils::must_create_connection_and_user,
        endpoints::{self, format_endpoint},
        test_utils::{assert_error, state_with_connection, with_user},
    };

    #[tokio::test]
    async fn default_category_cannot_change_kind() {
        let (connection, user_id) = must_create_connection_and_user();
        let default = default_category(user_id, CategoryKind::Income, &connection).unwrap();
        let app = Router::new()
            .route(endpoints::CATEGORY, put(update_category_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();

        let response = server
            .put(&format_endpoint(endpoints::CATEGORY, default.id))
            .json(&json!({ "name": "Other", "kind": "expense" }))
            .await;

        assert_error(
            &response,
            StatusCode::CONFLICT,
            "default categories cannot be deleted or change kind",
        );
    }
}
