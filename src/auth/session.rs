//! Log-in sessions. Each issued token refers to a session row so that tokens can be revoked
//! before they expire.

use std::fmt::Display;

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID};

/// The ID of a log-in session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct SessionId(i64);

impl SessionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A log-in session of a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSession {
    pub id: SessionId,
    pub user_id: UserID,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub revoked_at: Option<OffsetDateTime>,
}

impl UserSession {
    /// Whether a token for this session should be accepted at `now`.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

pub fn create_user_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_session (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                revoked_at TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_user_session_user ON user_session(user_id)",
        (),
    )?;

    Ok(())
}

/// Start a new session for `user_id` that lasts for `duration` from now.
pub fn create_session(
    user_id: UserID,
    duration: Duration,
    connection: &Connection,
) -> Result<UserSession, Error> {
    let created_at = OffsetDateTime::now_utc();
    let expires_at = created_at + duration;

    connection.execute(
        "INSERT INTO user_session (user_id, created_at, expires_at) VALUES (?1, ?2, ?3)",
        (user_id.as_i64(), created_at, expires_at),
    )?;

    Ok(UserSession {
        id: SessionId::new(connection.last_insert_rowid()),
        user_id,
        created_at,
        expires_at,
        revoked_at: None,
    })
}

fn map_session_row(row: &Row) -> Result<UserSession, rusqlite::Error> {
    Ok(UserSession {
        id: SessionId::new(row.get(0)?),
        user_id: UserID::new(row.get(1)?),
        created_at: row.get(2)?,
        expires_at: row.get(3)?,
        revoked_at: row.get(4)?,
    })
}

/// Get the session `session_id` if it belongs to `user_id`.
///
/// Returns `Ok(None)` if there is no such session.
pub fn get_session(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<UserSession>, Error> {
    connection
        .query_row(
            "SELECT id, user_id, created_at, expires_at, revoked_at
            FROM user_session WHERE id = ?1 AND user_id = ?2",
            (session_id.as_i64(), user_id.as_i64()),
            map_session_row,
        )
        .optional()
        .map_err(Error::from)
}

/// Mark a session as revoked so its token is no longer accepted.
pub fn revoke_session(
    session_id: SessionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE user_session SET revoked_at = ?1
        WHERE id = ?2 AND user_id = ?3 AND revoked_at IS NULL",
        (OffsetDateTime::now_utc(), session_id.as_i64(), user_id.as_i64()),
    )?;

    Ok(())
}

/// Revoke every session of `user_id` except `keep`.
///
/// Returns the number of revoked sessions.
pub fn revoke_other_sessions(
    user_id: UserID,
    keep: SessionId,
    connection: &Connection,
) -> Result<usize, Error> {
    let revoked = connection.execute(
        "UPDATE user_session SET revoked_at = ?1
        WHERE user_id = ?2 AND id != ?3 AND revoked_at IS NULL",
        (OffsetDateTime::now_utc(), user_id.as_i64(), keep.as_i64()),
    )?;

    Ok(revoked)
}

/// Get the sessions of `user_id` that are neither revoked nor expired, newest first.
pub fn get_active_sessions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<UserSession>, Error> {
    let now = OffsetDateTime::now_utc();

    let sessions = connection
        .prepare(
            "SELECT id, user_id, created_at, expires_at, revoked_at
            FROM user_session WHERE user_id = ?1 AND revoked_at IS NULL
            ORDER BY id DESC",
        )?
        .query_map([user_id.as_i64()], map_session_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sessions
        .into_iter()
        .filter(|session| session.is_active(now))
        .collect())
}

/// Count the sessions across all users that are neither revoked nor expired.
pub fn count_active_sessions(connection: &Connection) -> Result<u64, Error> {
    let now = OffsetDateTime::now_utc();

    let expiry_times = connection
        .prepare("SELECT expires_at FROM user_session WHERE revoked_at IS NULL")?
        .query_map([], |row| row.get::<_, OffsetDateTime>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expiry_times
        .into_iter()
        .filter(|expires_at| *expires_at > now)
        .count() as u64)
}
