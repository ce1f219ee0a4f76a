//! Encoding and decoding of the JSON web tokens handed out at log-in.

use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    app_state::JwtKeys,
    auth::{SessionId, UserID},
};

/// The contents of a JSON Web Token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: i64,
    /// The ID of the session the token belongs to.
    pub sid: i64,
    /// The time the token was issued as a unix timestamp.
    pub iat: i64,
    /// The expiry time of the token as a unix timestamp.
    pub exp: i64,
}

impl Claims {
    /// Create the claims for a token issued at `issued_at` and valid for `duration`.
    pub fn new(
        user_id: UserID,
        session_id: SessionId,
        issued_at: OffsetDateTime,
        duration: Duration,
    ) -> Self {
        Self {
            sub: user_id.as_i64(),
            sid: session_id.as_i64(),
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + duration).unix_timestamp(),
        }
    }

    pub fn user_id(&self) -> UserID {
        UserID::new(self.sub)
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.sid)
    }
}

/// Sign `claims` with the HS256 algorithm.
///
/// # Errors
///
/// Returns [Error::TokenCreation] if the token could not be encoded.
pub fn encode_token(claims: &Claims, keys: &JwtKeys) -> Result<String, Error> {
    encode(&Header::default(), claims, &keys.encoding_key).map_err(|error| {
        tracing::error!("could not encode JWT: {error}");
        Error::TokenCreation(error.to_string())
    })
}

/// Verify the signature and expiry of `token` and return its claims.
///
/// # Errors
///
/// Returns [Error::InvalidToken] if the token is malformed, has a bad signature, or has expired.
pub fn decode_token(token: &str, keys: &JwtKeys) -> Result<Claims, Error> {
    decode::<Claims>(token, &keys.decoding_key, &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(|error| {
            tracing::debug!("rejected JWT: {error}");
            Error::InvalidToken
        })
}
