//! Endpoints for the current user: their profile, password and sessions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    audit::{AuditAction, record},
    auth::{
        PasswordHash, SessionId, User, UserID, UserSession, ValidatedPassword,
        get_active_sessions, get_password_hash, get_user_by_id, revoke_other_sessions,
        update_password,
    },
    db::lock_connection,
};

/// The state needed by endpoints that only touch the current user's data.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for getting the logged in user.
pub async fn get_current_user(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<User>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_user_by_id(user_id, &connection).map(Json)
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// A route handler for changing the logged in user's password.
///
/// Every other session of the user is revoked.
pub async fn change_password(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Extension(session_id): Extension<SessionId>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, Error> {
    let user = {
        let connection = lock_connection(&state.db_connection)?;
        let current_hash = get_password_hash(user_id, &connection)?;

        let is_password_correct = current_hash
            .verify(&request.current_password)
            .map_err(|error| Error::HashingError(error.to_string()))?;

        if !is_password_correct {
            return Err(Error::InvalidCredentials);
        }

        get_user_by_id(user_id, &connection)?
    };

    let new_password =
        ValidatedPassword::new(&request.new_password, &[&user.email, &user.name])?;
    let new_hash = PasswordHash::new(new_password, PasswordHash::DEFAULT_COST)?;

    let connection = lock_connection(&state.db_connection)?;
    let transaction = connection.unchecked_transaction()?;
    update_password(user_id, &new_hash, &transaction)?;
    let revoked = revoke_other_sessions(user_id, session_id, &transaction)?;
    record(
        user_id,
        AuditAction::Update,
        "password",
        Some(user_id.as_i64()),
        None,
        &transaction,
    )?;
    transaction.commit()?;

    tracing::info!("user {user_id} changed their password, revoked {revoked} other sessions");

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for listing the logged in user's active sessions.
pub async fn list_sessions(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<UserSession>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_active_sessions(user_id, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Json, extract::State, http::StatusCode};
    use time::Duration;

    use crate::{
        Error,
        auth::{
            PasswordHash, ValidatedPassword, create_session, get_active_sessions,
            get_password_hash, update_password,
        },
        db::test_utils::must_create_connection_and_user,
    };

    use super::{
        ChangePasswordRequest, ProfileState, change_password, get_current_user, list_sessions,
    };

    #[tokio::test]
    async fn returns_current_user() {
        let (connection, user_id) = must_create_connection_and_user();
        let state = ProfileState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let Json(user) = get_current_user(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn change_password_revokes_other_sessions() {
        let (connection, user_id) = must_create_connection_and_user();
        let old_hash = PasswordHash::new(ValidatedPassword::new_unchecked("oldpassword"), 4).unwrap();
        update_password(user_id, &old_hash, &connection).unwrap();
        let current = create_session(user_id, Duration::hours(1), &connection).unwrap();
        create_session(user_id, Duration::hours(1), &connection).unwrap();
        let state = ProfileState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let status = change_password(
            State(state.clone()),
            Extension(user_id),
            Extension(current.id),
            Json(ChangePasswordRequest {
                current_password: "oldpassword".to_owned(),
                new_password: "averysafeandsecurepassword".to_owned(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        let connection = state.db_connection.lock().unwrap();
        let new_hash = get_password_hash(user_id, &connection).unwrap();
        assert!(new_hash.verify("averysafeandsecurepassword").unwrap());
        let sessions = get_active_sessions(user_id, &connection).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, current.id);
    }

    #[tokio::test]
    async fn change_password_rejects_wrong_current_password() {
        let (connection, user_id) = must_create_connection_and_user();
        let old_hash = PasswordHash::new(ValidatedPassword::new_unchecked("oldpassword"), 4).unwrap();
        update_password(user_id, &old_hash, &connection).unwrap();
        let current = create_session(user_id, Duration::hours(1), &connection).unwrap();
        let state = ProfileState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let result = change_password(
            State(state),
            Extension(user_id),
            Extension(current.id),
            Json(ChangePasswordRequest {
                current_password: "notmypassword".to_owned(),
                new_password: "averysafeandsecurepassword".to_owned(),
            }),
        )
        .await;

        assert_eq!(result, Err(Error::InvalidCredentials));
    }

    #[tokio::test]
    async fn lists_active_sessions() {
        let (connection, user_id) = must_create_connection_and_user();
        create_session(user_id, Duration::hours(1), &connection).unwrap();
        create_session(user_id, Duration::hours(1), &connection).unwrap();
        let state = ProfileState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let Json(sessions) = list_sessions(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(sessions.len(), 2);
    }
}
