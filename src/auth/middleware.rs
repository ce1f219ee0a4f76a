//! Authentication middleware that validates bearer tokens and checks user roles.

use std::sync::{Arc, Mutex};

use axum::{
    RequestPartsExt,
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    app_state::JwtKeys,
    auth::{Role, SessionId, UserID, get_session, get_user_by_id, token::decode_token},
    db::lock_connection,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The keys for verifying tokens.
    pub jwt_keys: JwtKeys,
    /// The database connection for checking sessions and roles.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware function that checks for a valid bearer token.
///
/// The user ID and session ID are placed into the request and the request executed normally if
/// the token is valid and its session has not been revoked, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>`
/// to receive the user ID and `Extension(session_id): Extension<SessionId>` for the session.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let bearer = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(Authorization(bearer))) => bearer,
        Err(_) => return Error::InvalidToken.into_response(),
    };

    let (user_id, session_id) = match validate_token(bearer.token(), &state) {
        Ok(ids) => ids,
        Err(error) => return error.into_response(),
    };

    parts.extensions.insert(user_id);
    parts.extensions.insert(session_id);
    let request = Request::from_parts(parts, body);

    next.run(request).await
}

fn validate_token(token: &str, state: &AuthState) -> Result<(UserID, SessionId), Error> {
    let claims = decode_token(token, &state.jwt_keys)?;
    let user_id = claims.user_id();
    let session_id = claims.session_id();

    let connection = lock_connection(&state.db_connection)?;
    let session = get_session(session_id, user_id, &connection)?.ok_or(Error::InvalidToken)?;

    if !session.is_active(OffsetDateTime::now_utc()) {
        tracing::debug!("rejected token for inactive session {session_id}");
        return Err(Error::InvalidToken);
    }

    Ok((user_id, session_id))
}

/// Middleware function that only lets admins through.
///
/// Must run after [auth_guard] so that the user ID is in the request extensions.
pub async fn admin_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let Some(user_id) = request.extensions().get::<UserID>().copied() else {
        tracing::error!("admin_guard ran without a user ID, is auth_guard missing?");
        return Error::InvalidToken.into_response();
    };

    let role = match lock_connection(&state.db_connection)
        .and_then(|connection| get_user_by_id(user_id, &connection))
    {
        Ok(user) => user.role,
        Err(Error::NotFound) => return Error::InvalidToken.into_response(),
        Err(error) => return error.into_response(),
    };

    if role != Role::Admin {
        return Error::Forbidden.into_response();
    }

    next.run(request).await
}
