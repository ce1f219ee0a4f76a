//! The endpoints for administering users and reading everyone's audit log.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    audit::{AuditAction, AuditEntry, AuditLogQuery, get_audit_entries, record},
    auth::{
        Role, User, UserID, count_active_sessions, count_users, get_all_users, get_user_by_id,
        update_role,
    },
    db::lock_connection,
    pagination::{Paginated, PaginationConfig},
    transaction::count_transactions,
};

/// The state needed by the admin endpoints.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub pagination_config: PaginationConfig,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for changing a user's role.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

/// Counts across all users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub user_count: u64,
    pub transaction_count: u64,
    pub active_session_count: u64,
}

/// Change the role of `target`.
///
/// # Errors
/// Returns [Error::SelfDemotion] if an admin tries to take away their own admin role, or
/// [Error::NotFound] if `target` does not exist.
pub fn change_role(
    admin_id: UserID,
    target: UserID,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    if admin_id == target && role != Role::Admin {
        return Err(Error::SelfDemotion);
    }

    let sql_transaction = connection.unchecked_transaction()?;
    let previous = get_user_by_id(target, &sql_transaction)?;
    let user = update_role(target, role, &sql_transaction)?;
    record(
        admin_id,
        AuditAction::Update,
        "user_role",
        Some(target.as_i64()),
        Some(&format!("{} -> {}", previous.role, user.role)),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    tracing::info!("user {admin_id} changed the role of user {target} to {role}");

    Ok(user)
}

pub fn get_admin_stats(connection: &Connection) -> Result<AdminStats, Error> {
    Ok(AdminStats {
        user_count: count_users(connection)?,
        transaction_count: count_transactions(connection)?,
        active_session_count: count_active_sessions(connection)?,
    })
}

pub async fn list_users_endpoint(
    State(state): State<AdminState>,
) -> Result<Json<Vec<User>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_all_users(&connection).map(Json)
}

pub async fn change_role_endpoint(
    State(state): State<AdminState>,
    Extension(admin_id): Extension<UserID>,
    Path(target): Path<i64>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<User>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    change_role(admin_id, UserID::new(target), request.role, &connection).map(Json)
}

/// A route handler for the audit log of every user, optionally narrowed down to one user.
pub async fn admin_audit_log_endpoint(
    State(state): State<AdminState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Paginated<AuditEntry>>, Error> {
    let page = state
        .pagination_config
        .page_request(query.page, query.per_page);
    let connection = lock_connection(&state.db_connection)?;

    get_audit_entries(query.user_id.map(UserID::new), page, &connection).map(Json)
}

pub async fn admin_stats_endpoint(
    State(state): State<AdminState>,
) -> Result<Json<AdminStats>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_admin_stats(&connection).map(Json)
}
