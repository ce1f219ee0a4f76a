//! The endpoint for logging in a user and issuing a bearer token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    app_state::JwtKeys,
    audit::{AuditAction, record},
    auth::{
        User, create_session, get_user_credentials, normalize_email,
        token::{Claims, encode_token},
    },
    db::lock_connection,
};

/// How long a token is valid for when the user asks to be remembered.
pub const REMEMBER_ME_TOKEN_DURATION: Duration = Duration::days(7);

/// The state needed for logging in.
#[derive(Clone)]
pub struct LogInState {
    pub jwt_keys: JwtKeys,
    /// How long a token is valid for without "remember me".
    pub token_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The credentials entered at log-in.
#[derive(Debug, Deserialize)]
pub struct LogInRequest {
    pub email: String,
    pub password: String,
    /// Issue a long lived token.
    #[serde(default)]
    pub remember_me: bool,
}

/// The token issued at log-in.
#[derive(Debug, Serialize)]
pub struct LogInResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: User,
}

/// A route handler for logging in.
///
/// A wrong email and a wrong password give the same error.
pub async fn log_in(
    State(state): State<LogInState>,
    Json(request): Json<LogInRequest>,
) -> Result<Json<LogInResponse>, Error> {
    let email = normalize_email(&request.email).map_err(|_| Error::InvalidCredentials)?;

    let connection = lock_connection(&state.db_connection)?;

    let (user, password_hash) = match get_user_credentials(&email, &connection) {
        Ok(credentials) => credentials,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    let is_password_correct = password_hash.verify(&request.password).map_err(|error| {
        tracing::error!("could not verify password for user {}: {error}", user.id);
        Error::HashingError(error.to_string())
    })?;

    if !is_password_correct {
        return Err(Error::InvalidCredentials);
    }

    let duration = if request.remember_me {
        REMEMBER_ME_TOKEN_DURATION
    } else {
        state.token_duration
    };

    let session = create_session(user.id, duration, &connection)?;
    let claims = Claims::new(user.id, session.id, session.created_at, duration);
    let token = encode_token(&claims, &state.jwt_keys)?;

    record(
        user.id,
        AuditAction::LogIn,
        "session",
        Some(session.id.as_i64()),
        None,
        &connection,
    )?;

    Ok(Json(LogInResponse {
        token,
        expires_at: session.expires_at,
        user,
    }))
}
