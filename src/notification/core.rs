//! Stored notifications and reading them.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, database_id::DatabaseId};

pub type NotificationId = DatabaseId;

text_enum! {
    /// What a notification is about.
    pub enum NotificationKind {
        ReceivableDue => "receivable_due",
        PayableDue => "payable_due",
        FixedAccountDue => "fixed_account_due",
        FinancingDue => "financing_due",
        GoalAchieved => "goal_achieved",
        System => "system",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Identifies the event, e.g. `payable:12:2025-03-01`. Unique per user.
    pub reference: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A notification that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    /// Only unread notifications when true.
    #[serde(default)]
    pub unread: bool,
}

pub fn create_notification_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS notification (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            reference TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, reference),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const COLUMNS: &str = "id, kind, title, message, reference, read, created_at";

fn map_row(row: &Row) -> Result<Notification, rusqlite::Error> {
    Ok(Notification {
        id: row.get(0)?,
        kind: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        reference: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Save `notification` unless the user already has one with the same reference.
///
/// Returns true if a notification was created.
pub fn insert_notification(
    user_id: UserID,
    notification: &NewNotification,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "INSERT OR IGNORE INTO notification (user_id, kind, title, message, reference, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            notification.kind,
            &notification.title,
            &notification.message,
            &notification.reference,
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(rows_affected > 0)
}

/// Get the user's notifications, newest first.
pub fn get_notifications(
    user_id: UserID,
    unread_only: bool,
    connection: &Connection,
) -> Result<Vec<Notification>, Error> {
    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM notification
            WHERE user_id = ?1 AND (?2 = 0 OR read = 0)
            ORDER BY created_at DESC, id DESC"
        ))?
        .query_map((user_id.as_i64(), unread_only), map_row)?
        .map(|notification| notification.map_err(Error::from))
        .collect()
}

pub fn mark_read(
    user_id: UserID,
    notification_id: NotificationId,
    connection: &Connection,
) -> Result<Notification, Error> {
    connection
        .prepare(&format!(
            "UPDATE notification SET read = 1 WHERE id = ?1 AND user_id = ?2 RETURNING {COLUMNS}"
        ))?
        .query_row((notification_id, user_id.as_i64()), map_row)
        .map_err(Error::from)
}

/// Mark every notification of the user as read, returning how many were unread.
pub fn mark_all_read(user_id: UserID, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE notification SET read = 1 WHERE user_id = ?1 AND read = 0",
            [user_id.as_i64()],
        )
        .map_err(Error::from)
}

pub fn delete_notification(
    user_id: UserID,
    notification_id: NotificationId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM notification WHERE id = ?1 AND user_id = ?2",
        (notification_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        db::test_utils::{must_create_connection_and_user, must_create_test_user},
    };

    use super::{
        NewNotification, NotificationKind, delete_notification, get_notifications,
        insert_notification, mark_all_read, mark_read,
    };

    fn notification(reference: &str) -> NewNotification {
        NewNotification {
            kind: NotificationKind::System,
            title: "Hello".to_owned(),
            message: "Welcome".to_owned(),
            reference: reference.to_owned(),
        }
    }

    #[test]
    fn insert_is_idempotent_per_reference() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);

        assert_eq!(insert_notification(user_id, &notification("a"), &connection), Ok(true));
        assert_eq!(insert_notification(user_id, &notification("a"), &connection), Ok(false));
        assert_eq!(
            insert_notification(other_user, &notification("a"), &connection),
            Ok(true)
        );
        assert_eq!(get_notifications(user_id, false, &connection).unwrap().len(), 1);
    }

    #[test]
    fn read_flags() {
        let (connection, user_id) = must_create_connection_and_user();
        insert_notification(user_id, &notification("a"), &connection).unwrap();
        insert_notification(user_id, &notification("b"), &connection).unwrap();
        let first = get_notifications(user_id, false, &connection).unwrap()[0].clone();

        let read = mark_read(user_id, first.id, &connection).unwrap();

        assert!(read.read);
        assert_eq!(get_notifications(user_id, true, &connection).unwrap().len(), 1);
        assert_eq!(mark_all_read(user_id, &connection), Ok(1));
        assert!(get_notifications(user_id, true, &connection).unwrap().is_empty());
    }

    #[test]
    fn delete_is_scoped_to_user() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);
        insert_notification(user_id, &notification("a"), &connection).unwrap();
        let id = get_notifications(user_id, false, &connection).unwrap()[0].id;

        assert_eq!(mark_read(other_user, id, &connection), Err(Error::NotFound));
        assert_eq!(
            delete_notification(other_user, id, &connection),
            Err(Error::NotFound)
        );
        delete_notification(user_id, id, &connection).unwrap();
        assert!(get_notifications(user_id, false, &connection).unwrap().is_empty());
    }
}
