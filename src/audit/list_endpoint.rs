//! The endpoint for reading the current user's audit log.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    audit::{AuditEntry, get_audit_entries},
    auth::UserID,
    db::lock_connection,
    pagination::{Paginated, PaginationConfig},
};

/// The state needed for reading the audit log.
#[derive(Debug, Clone)]
pub struct AuditState {
    pub pagination_config: PaginationConfig,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuditState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the audit log endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    /// Only used by the admin endpoint.
    pub user_id: Option<i64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// A route handler for the current user's audit log.
pub async fn list_own_audit_log(
    State(state): State<AuditState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Paginated<AuditEntry>>, Error> {
    let page = state
        .pagination_config
        .page_request(query.page, query.per_page);
    let connection = lock_connection(&state.db_connection)?;

    get_audit_entries(Some(user_id), page, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Query, State},
    };

    use crate::{
        audit::{AuditAction, record},
        db::test_utils::{must_create_connection_and_user, must_create_test_user},
        pagination::PaginationConfig,
    };

    use super::{AuditLogQuery, AuditState, list_own_audit_log};

    #[tokio::test]
    async fn ignores_user_id_of_other_users() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);
        record(other_user, AuditAction::LogIn, "session", None, None, &connection).unwrap();
        record(user_id, AuditAction::LogIn, "session", None, None, &connection).unwrap();
        let state = AuditState {
            pagination_config: PaginationConfig::default(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let Json(page) = list_own_audit_log(
            State(state),
            Extension(user_id),
            Query(AuditLogQuery {
                user_id: Some(other_user.as_i64()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].user_id, user_id);
    }
}
