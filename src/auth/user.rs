//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

text_enum! {
    /// What a user is allowed to do.
    pub enum Role {
        /// Can manage other users and read the audit log of every user.
        Admin => "admin",
        /// Can only access their own data.
        User => "user",
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email address used to log in.
    pub email: String,
    /// The name to display for the user.
    pub name: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Check that `email` looks like an email address and normalise it to lowercase.
///
/// # Errors
///
/// Returns [Error::InvalidEmail] if `email` is not a valid email address.
pub fn normalize_email(email: &str) -> Result<String, Error> {
    let email = email.trim();

    if EmailAddress::is_valid(email) {
        Ok(email.to_lowercase())
    } else {
        Err(Error::InvalidEmail(email.to_owned()))
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The caller should ensure that `email` has been normalised with [normalize_email].
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    email: &str,
    name: &str,
    password_hash: PasswordHash,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO user (email, name, password, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            (email, name, password_hash.as_ref(), role, created_at),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::DuplicateEmail
            }
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_owned(),
        name: name.to_owned(),
        role,
        created_at,
    })
}

const USER_COLUMNS: &str = "id, email, name, role, created_at";

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: UserID::new(row.get(0)?),
        email: row.get(1)?,
        name: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get a user and their password hash by email, for checking log-in credentials.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the email address `email`.
pub fn get_user_credentials(
    email: &str,
    connection: &Connection,
) -> Result<(User, PasswordHash), Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS}, password FROM user WHERE email = :email"
        ))?
        .query_row(&[(":email", &email)], |row| {
            let user = map_user_row(row)?;
            let raw_password_hash: String = row.get(5)?;

            Ok((user, PasswordHash::new_unchecked(&raw_password_hash)))
        })
        .map_err(|error| error.into())
}

/// Get the password hash of a user.
pub fn get_password_hash(user_id: UserID, connection: &Connection) -> Result<PasswordHash, Error> {
    let raw_password_hash: String = connection.query_row(
        "SELECT password FROM user WHERE id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    Ok(PasswordHash::new_unchecked(&raw_password_hash))
}

/// Replace the password hash of a user.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Change the role of a user.
pub fn update_role(user_id: UserID, role: Role, connection: &Connection) -> Result<User, Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET role = ?1 WHERE id = ?2",
        (role, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_user_by_id(user_id, connection)
}

/// Get every user ordered by ID.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user ORDER BY id ASC"))?
        .query_map([], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(Error::from))
        .collect()
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}
