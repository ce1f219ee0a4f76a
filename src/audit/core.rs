//! The audit log table and the queries for recording and reading entries.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    pagination::{PageRequest, Paginated},
};

text_enum! {
    /// The kind of change recorded in the audit log.
    pub enum AuditAction {
        Create => "create",
        Update => "update",
        Delete => "delete",
        LogIn => "log_in",
        LogOut => "log_out",
    }
}

/// A single entry in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub id: DatabaseId,
    /// The user who made the change.
    pub user_id: UserID,
    pub action: AuditAction,
    /// The kind of record that was changed, e.g. "account".
    pub entity: String,
    /// The ID of the changed record, if there is one.
    pub entity_id: Option<DatabaseId>,
    /// Free-form context, e.g. the amount of a payment.
    pub details: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn create_audit_log_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                entity TEXT NOT NULL,
                entity_id INTEGER,
                details TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_user ON audit_log(user_id, id)",
        (),
    )?;

    Ok(())
}

/// Add an entry to the audit log.
///
/// Should be called with the same connection (or SQL transaction) as the change being recorded.
pub fn record(
    user_id: UserID,
    action: AuditAction,
    entity: &str,
    entity_id: Option<DatabaseId>,
    details: Option<&str>,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO audit_log (user_id, action, entity, entity_id, details, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            action,
            entity,
            entity_id,
            details,
            OffsetDateTime::now_utc(),
        ),
    )?;

    tracing::debug!("audit: user {user_id} {action} {entity} {entity_id:?}");

    Ok(())
}

fn map_audit_row(row: &Row) -> Result<AuditEntry, rusqlite::Error> {
    Ok(AuditEntry {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        action: row.get(2)?,
        entity: row.get(3)?,
        entity_id: row.get(4)?,
        details: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Get a page of audit log entries, newest first.
///
/// If `user_id` is `None` the entries of every user are returned.
pub fn get_audit_entries(
    user_id: Option<UserID>,
    page: PageRequest,
    connection: &Connection,
) -> Result<Paginated<AuditEntry>, Error> {
    let user_id = user_id.map(|id| id.as_i64());

    let total_items: u64 = connection.query_row(
        "SELECT COUNT(id) FROM audit_log WHERE ?1 IS NULL OR user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;

    let items = connection
        .prepare(
            "SELECT id, user_id, action, entity, entity_id, details, created_at
            FROM audit_log WHERE ?1 IS NULL OR user_id = ?1
            ORDER BY id DESC LIMIT ?2 OFFSET ?3",
        )?
        .query_map((user_id, page.per_page, page.offset()), map_audit_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Paginated::new(items, page, total_items))
}

#[cfg(test)]
mod tests {
    use crate::{
        db::test_utils::{must_create_connection_and_user, must_create_test_user},
        pagination::PageRequest,
    };

    use super::{AuditAction, get_audit_entries, record};

    #[test]
    fn records_and_lists_newest_first() {
        let (connection, user_id) = must_create_connection_and_user();
        record(user_id, AuditAction::Create, "account", Some(1), None, &connection).unwrap();
        record(
            user_id,
            AuditAction::Delete,
            "account",
            Some(1),
            Some("Savings"),
            &connection,
        )
        .unwrap();

        let page = get_audit_entries(
            Some(user_id),
            PageRequest {
                page: 1,
                per_page: 10,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(page.total_items, 2);
        assert_eq!(page.items[0].action, AuditAction::Delete);
        assert_eq!(page.items[0].details.as_deref(), Some("Savings"));
        assert_eq!(page.items[1].action, AuditAction::Create);
    }

    #[test]
    fn filters_by_user() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);
        record(user_id, AuditAction::LogIn, "session", Some(1), None, &connection).unwrap();
        record(other_user, AuditAction::LogIn, "session", Some(2), None, &connection).unwrap();
        let page_request = PageRequest {
            page: 1,
            per_page: 10,
        };

        let own = get_audit_entries(Some(user_id), page_request, &connection).unwrap();
        let all = get_audit_entries(None, page_request, &connection).unwrap();

        assert_eq!(own.total_items, 1);
        assert_eq!(own.items[0].user_id, user_id);
        assert_eq!(all.total_items, 2);
    }

    #[test]
    fn pages_results() {
        let (connection, user_id) = must_create_connection_and_user();
        for id in 1..=5 {
            record(user_id, AuditAction::Update, "account", Some(id), None, &connection).unwrap();
        }

        let page = get_audit_entries(
            Some(user_id),
            PageRequest {
                page: 2,
                per_page: 2,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].entity_id, Some(3));
    }
}
