//! The supplier and customer endpoints.
//!
//! The same handlers serve both `/api/suppliers` and `/api/customers`; the router layers a
//! [CounterpartyKind] extension onto each group of routes.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    audit::{AuditAction, record},
    auth::UserID,
    counterparty::{
        Counterparty, CounterpartyId, CounterpartyKind, CounterpartyQuery, CounterpartyRequest,
        create_counterparty, delete_counterparty, get_counterparties, get_counterparty,
        update_counterparty,
    },
    db::lock_connection,
};

/// The state needed by the supplier and customer endpoints.
#[derive(Debug, Clone)]
pub struct CounterpartyState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CounterpartyState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn list_counterparties_endpoint(
    State(state): State<CounterpartyState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CounterpartyKind>,
    Query(query): Query<CounterpartyQuery>,
) -> Result<Json<Vec<Counterparty>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_counterparties(user_id, kind, &query, &connection).map(Json)
}

pub async fn get_counterparty_endpoint(
    State(state): State<CounterpartyState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CounterpartyKind>,
    Path(counterparty_id): Path<CounterpartyId>,
) -> Result<Json<Counterparty>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_counterparty(user_id, kind, counterparty_id, &connection).map(Json)
}

pub async fn create_counterparty_endpoint(
    State(state): State<CounterpartyState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CounterpartyKind>,
    Json(request): Json<CounterpartyRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let counterparty = create_counterparty(user_id, kind, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        kind.as_str(),
        Some(counterparty.id),
        Some(&counterparty.name),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(counterparty)))
}

pub async fn update_counterparty_endpoint(
    State(state): State<CounterpartyState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CounterpartyKind>,
    Path(counterparty_id): Path<CounterpartyId>,
    Json(request): Json<CounterpartyRequest>,
) -> Result<Json<Counterparty>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let counterparty =
        update_counterparty(user_id, kind, counterparty_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Update,
        kind.as_str(),
        Some(counterparty.id),
        Some(&counterparty.name),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(counterparty))
}

pub async fn delete_counterparty_endpoint(
    State(state): State<CounterpartyState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CounterpartyKind>,
    Path(counterparty_id): Path<CounterpartyId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_counterparty(user_id, kind, counterparty_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        kind.as_str(),
        Some(counterparty_id),
        None,
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}
