use axum::{Extension, http::StatusCode};
use axum_test::TestResponse;
use rusqlite::Connection;
use serde_json::Value;

use crate::{AppState, auth::UserID, pagination::PaginationConfig};

/// Wrap an initialised test database in an [AppState].
#[track_caller]
pub(crate) fn state_with_connection(connection: Connection) -> AppState {
    AppState::new(connection, "foobar", "Etc/UTC", PaginationConfig::default())
        .expect("Could not create app state")
}

/// A layer that stands in for the auth middleware by inserting `user_id` into every request.
pub(crate) fn with_user(user_id: UserID) -> Extension<UserID> {
    Extension(user_id)
}

/// Check the status code and the JSON error message of a response.
#[track_caller]
pub(crate) fn assert_error(response: &TestResponse, status: StatusCode, message: &str) {
    response.assert_status(status);

    let body: Value = response.json();
    assert_eq!(
        body["error"], message,
        "want error message {message:?}, got {body}"
    );
}
