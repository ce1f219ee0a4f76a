//! The receivable, payable and payment endpoints.
//!
//! The same handlers serve `/api/receivables` and `/api/payables`; the router layers a
//! [Direction] extension onto each group of routes.

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
    db::lock_connection,
    obligation::{
        Direction, Obligation, ObligationId, ObligationQuery, ObligationRequest, Payment,
        PaymentId, PaymentRequest, create_obligation, create_payment, delete_obligation,
        delete_payment, get_obligation, get_obligations, get_payments, update_obligation,
    },
    settings::user_today,
};

/// The state needed by the receivable, payable and payment endpoints.
#[derive(Debug, Clone)]
pub struct ObligationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ObligationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the user's receivables or payables.
pub async fn list_obligations_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Extension(direction): Extension<Direction>,
    Query(query): Query<ObligationQuery>,
) -> Result<Json<Vec<Obligation>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    get_obligations(user_id, direction, &query, today, &connection).map(Json)
}

pub async fn get_obligation_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Extension(direction): Extension<Direction>,
    Path(obligation_id): Path<ObligationId>,
) -> Result<Json<Obligation>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    get_obligation(user_id, direction, obligation_id, today, &connection).map(Json)
}

pub async fn create_obligation_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Extension(direction): Extension<Direction>,
    Json(request): Json<ObligationRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let obligation = create_obligation(user_id, direction, request, today, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        direction.as_str(),
        Some(obligation.id),
        Some(&obligation.amount.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(obligation)))
}

pub async fn update_obligation_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Extension(direction): Extension<Direction>,
    Path(obligation_id): Path<ObligationId>,
    Json(request): Json<ObligationRequest>,
) -> Result<Json<Obligation>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let obligation = update_obligation(
        user_id,
        direction,
        obligation_id,
        request,
        today,
        &sql_transaction,
    )?;
    record(
        user_id,
        AuditAction::Update,
        direction.as_str(),
        Some(obligation.id),
        Some(&obligation.amount.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(obligation))
}

/// A route handler for deleting a receivable or payable with all of its payments.
pub async fn delete_obligation_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Extension(direction): Extension<Direction>,
    Path(obligation_id): Path<ObligationId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_obligation(user_id, direction, obligation_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        direction.as_str(),
        Some(obligation_id),
        None,
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_payments_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Extension(direction): Extension<Direction>,
    Path(obligation_id): Path<ObligationId>,
) -> Result<Json<Vec<Payment>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_payments(user_id, direction, obligation_id, &connection).map(Json)
}

/// A route handler for paying off part or all of a receivable or payable.
pub async fn create_payment_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Extension(direction): Extension<Direction>,
    Path(obligation_id): Path<ObligationId>,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let receipt = create_payment(
        user_id,
        direction,
        obligation_id,
        request,
        today,
        &sql_transaction,
    )?;
    record(
        user_id,
        AuditAction::Create,
        "payment",
        Some(receipt.payment.id),
        Some(&receipt.payment.amount.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn delete_payment_endpoint(
    State(state): State<ObligationState>,
    Extension(user_id): Extension<UserID>,
    Path(payment_id): Path<PaymentId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let payment = delete_payment(user_id, payment_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        "payment",
        Some(payment.id),
        Some(&payment.amount.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}
