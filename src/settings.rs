//! Per-user settings: display currency, how early to remind about due dates, and the timezone
//! used to work out what "today" is.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    db::lock_connection,
    timezone::{get_local_offset, local_today},
};

/// The currency new users start with.
pub const DEFAULT_CURRENCY: &str = "BRL";
/// How many days ahead of a due date notifications are created by default.
pub const DEFAULT_REMINDER_DAYS: u32 = 3;
/// The largest reminder window a user may choose.
pub const MAX_REMINDER_DAYS: u32 = 90;

/// The settings of a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// ISO 4217 currency code, e.g. "BRL".
    pub currency: String,
    /// Create notifications for items due within this many days.
    pub reminder_days: u32,
    /// Canonical timezone name, e.g. "America/Sao_Paulo".
    pub timezone: String,
}

impl UserSettings {
    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] for a malformed currency or reminder window and
    /// [Error::InvalidTimezone] for an unknown timezone.
    pub fn validate(&self) -> Result<(), Error> {
        validate_currency(&self.currency)?;

        if self.reminder_days > MAX_REMINDER_DAYS {
            return Err(Error::Validation(format!(
                "reminder_days must be between 0 and {MAX_REMINDER_DAYS}"
            )));
        }

        if get_local_offset(&self.timezone).is_none() {
            return Err(Error::InvalidTimezone(self.timezone.clone()));
        }

        Ok(())
    }
}

/// Check that `currency` looks like an ISO 4217 code, e.g. "USD".
pub fn validate_currency(currency: &str) -> Result<(), Error> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "currency must be a three letter upper-case code, got \"{currency}\""
        )))
    }
}

pub fn create_user_setting_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_setting (
                user_id INTEGER PRIMARY KEY,
                currency TEXT NOT NULL,
                reminder_days INTEGER NOT NULL,
                timezone TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert the settings a new user starts with.
pub fn create_default_settings(
    user_id: UserID,
    timezone: &str,
    connection: &Connection,
) -> Result<UserSettings, Error> {
    let settings = UserSettings {
        currency: DEFAULT_CURRENCY.to_owned(),
        reminder_days: DEFAULT_REMINDER_DAYS,
        timezone: timezone.to_owned(),
    };

    connection.execute(
        "INSERT OR IGNORE INTO user_setting (user_id, currency, reminder_days, timezone)
        VALUES (?1, ?2, ?3, ?4)",
        (
            user_id.as_i64(),
            &settings.currency,
            settings.reminder_days,
            &settings.timezone,
        ),
    )?;

    Ok(settings)
}

pub fn get_settings(user_id: UserID, connection: &Connection) -> Result<UserSettings, Error> {
    connection
        .query_row(
            "SELECT currency, reminder_days, timezone FROM user_setting WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| {
                Ok(UserSettings {
                    currency: row.get(0)?,
                    reminder_days: row.get(1)?,
                    timezone: row.get(2)?,
                })
            },
        )
        .map_err(Error::from)
}

/// Replace the settings of `user_id` after validating them.
pub fn update_settings(
    user_id: UserID,
    settings: &UserSettings,
    connection: &Connection,
) -> Result<(), Error> {
    settings.validate()?;

    connection.execute(
        "INSERT INTO user_setting (user_id, currency, reminder_days, timezone)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(user_id) DO UPDATE SET
            currency = excluded.currency,
            reminder_days = excluded.reminder_days,
            timezone = excluded.timezone",
        (
            user_id.as_i64(),
            &settings.currency,
            settings.reminder_days,
            &settings.timezone,
        ),
    )?;

    Ok(())
}

/// Today's date in the timezone chosen by `user_id`.
pub fn user_today(user_id: UserID, connection: &Connection) -> Result<Date, Error> {
    let settings = get_settings(user_id, connection)?;

    local_today(&settings.timezone)
}

/// The state needed for the settings endpoints.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for getting the current user's settings.
pub async fn get_settings_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<UserSettings>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_settings(user_id, &connection).map(Json)
}

/// A route handler for replacing the current user's settings.
pub async fn update_settings_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
    Json(settings): Json<UserSettings>,
) -> Result<Json<UserSettings>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_settings(user_id, &settings, &connection)?;

    Ok(Json(settings))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Json, extract::State};

    use crate::{Error, db::test_utils::must_create_connection_and_user};

    use super::{
        DEFAULT_CURRENCY, SettingsState, UserSettings, get_settings, update_settings,
        update_settings_endpoint, user_today,
    };

    #[test]
    fn new_users_have_default_settings() {
        let (connection, user_id) = must_create_connection_and_user();

        let settings = get_settings(user_id, &connection).unwrap();

        assert_eq!(settings.currency, DEFAULT_CURRENCY);
        assert_eq!(settings.timezone, "Etc/UTC");
    }

    #[test]
    fn update_rejects_lower_case_currency() {
        let (connection, user_id) = must_create_connection_and_user();
        let settings = UserSettings {
            currency: "usd".to_owned(),
            reminder_days: 3,
            timezone: "Etc/UTC".to_owned(),
        };

        let result = update_settings(user_id, &settings, &connection);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn update_rejects_long_reminder_window() {
        let (connection, user_id) = must_create_connection_and_user();
        let settings = UserSettings {
            currency: "USD".to_owned(),
            reminder_days: 91,
            timezone: "Etc/UTC".to_owned(),
        };

        let result = update_settings(user_id, &settings, &connection);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn update_rejects_unknown_timezone() {
        let (connection, user_id) = must_create_connection_and_user();
        let settings = UserSettings {
            currency: "USD".to_owned(),
            reminder_days: 3,
            timezone: "Mars/Olympus_Mons".to_owned(),
        };

        let result = update_settings(user_id, &settings, &connection);

        assert_eq!(
            result,
            Err(Error::InvalidTimezone("Mars/Olympus_Mons".to_owned()))
        );
    }

    #[test]
    fn user_today_uses_settings_timezone() {
        let (connection, user_id) = must_create_connection_and_user();

        assert!(user_today(user_id, &connection).is_ok());
    }

    #[tokio::test]
    async fn endpoint_saves_settings() {
        let (connection, user_id) = must_create_connection_and_user();
        let state = SettingsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let want = UserSettings {
            currency: "NZD".to_owned(),
            reminder_days: 7,
            timezone: "Pacific/Auckland".to_owned(),
        };

        let Json(got) =
            update_settings_endpoint(State(state.clone()), Extension(user_id), Json(want.clone()))
                .await
                .unwrap();

        assert_eq!(got, want);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_settings(user_id, &connection).unwrap(), want);
    }
}
