//! Defines the endpoints for listing and fetching categories.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryId, CategoryQuery, CategoryState, get_categories, get_category},
    db::lock_connection,
};

/// A route handler for the user's categories, optionally filtered by `?kind=`.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categories(user_id, query.kind, &connection).map(Json)
}

/// A route handler for a single category.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category(user_id, category_id, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::{
        category::list_categories_endpoint,
        db::test_utils::must_create_connection_and_user,
        endpoints,
        test_utils::{state_with_connection, with_user},
    };

    #[tokio::test]
    async fn filters_by_kind_query() {
        let (connection, user_id) = must_create_connection_and_user();
        let app = Router::new()
            .route(endpoints::CATEGORIES, get(list_categories_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();

        let response = server
            .get(endpoints::CATEGORIES)
            .add_query_param("kind", "income")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let categories = body.as_array().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0]["kind"], "income");
        assert_eq!(categories[0]["is_default"], true);
    }
}
