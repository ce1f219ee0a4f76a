//! Defines the endpoint for creating a category.

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
    auth::UserID,
    category::{CategoryRequest, create_category},
    db::lock_connection,
};

/// The state needed by the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let category = create_category(user_id, request, &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        category::create_category_endpoint,
        db::test_utils::must_create_connection_and_user,
        endpoints,
        test_utils::{assert_error, state_with_connection, with_user},
    };

    #[tokio::test]
    async fn creates_category_then_rejects_duplicate() {
        let (connection, user_id) = must_create_connection_and_user();
        let app = Router::new()
            .route(endpoints::CATEGORIES, post(create_category_endpoint))
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));
        let server = TestServer::try_new(app).unwrap();
        let body = json!({ "name": "Rent", "kind": "expense" });

        let response = server.post(endpoints::CATEGORIES).json(&body).await;

        response.assert_status(StatusCode::CREATED);
        let category: Value = response.json();
        assert_eq!(category["name"], "Rent");
        assert_eq!(category["is_default"], false);

        let response = server.post(endpoints::CATEGORIES).json(&body).await;
        assert_error(
            &response,
            StatusCode::CONFLICT,
            "the category \"Rent\" already exists",
        );
    }
}
