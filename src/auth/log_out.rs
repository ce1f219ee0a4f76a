//! The endpoint for logging out the current session.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    Error,
    audit::{AuditAction, record},
    auth::{ProfileState, SessionId, UserID, revoke_session},
    db::lock_connection,
};

/// A route handler for logging out. Revokes the session of the token used for the request.
pub async fn log_out(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Extension(session_id): Extension<SessionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    revoke_session(session_id, user_id, &connection)?;
    record(
        user_id,
        AuditAction::LogOut,
        "session",
        Some(session_id.as_i64()),
        None,
        &connection,
    )?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{create_session, get_session, ProfileState},
        db::test_utils::must_create_connection_and_user,
    };

    use super::log_out;

    #[tokio::test]
    async fn log_out_revokes_session() {
        let (connection, user_id) = must_create_connection_and_user();
        let session = create_session(user_id, Duration::hours(1), &connection).unwrap();
        let state = ProfileState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let status = log_out(
            State(state.clone()),
            Extension(user_id),
            Extension(session.id),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        let connection = state.db_connection.lock().unwrap();
        let session = get_session(session.id, user_id, &connection)
            .unwrap()
            .unwrap();
        assert!(!session.is_active(OffsetDateTime::now_utc()));
    }
}
