//! The financing and installment endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
    financing::{
        FinancingDetails, FinancingId, FinancingPayment, FinancingPaymentId, FinancingRequest,
        PayInstallmentRequest, ScheduledInstallment, create_financing, delete_financing,
        delete_financing_payment, get_financing, get_financing_payments, get_financings,
        get_schedule, pay_installment, update_financing, with_summary,
    },
};

const AUDIT_ENTITY: &str = "financing";

/// The state needed by the financing endpoints.
#[derive(Debug, Clone)]
pub struct FinancingState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for FinancingState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn list_financings_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<FinancingDetails>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_financings(user_id, &connection)?
        .into_iter()
        .map(|financing| with_summary(financing, &connection))
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

pub async fn get_financing_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Path(financing_id): Path<FinancingId>,
) -> Result<Json<FinancingDetails>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let financing = get_financing(user_id, financing_id, &connection)?;

    with_summary(financing, &connection).map(Json)
}

pub async fn create_financing_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<FinancingRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let financing = create_financing(user_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        AUDIT_ENTITY,
        Some(financing.id),
        Some(&financing.principal.to_string()),
        &sql_transaction,
    )?;
    let details = with_summary(financing, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(details)))
}

pub async fn update_financing_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Path(financing_id): Path<FinancingId>,
    Json(request): Json<FinancingRequest>,
) -> Result<Json<FinancingDetails>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let financing = update_financing(user_id, financing_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Update,
        AUDIT_ENTITY,
        Some(financing.id),
        None,
        &sql_transaction,
    )?;
    let details = with_summary(financing, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(Json(details))
}

/// A route handler for deleting a financing along with its installment payments.
pub async fn delete_financing_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Path(financing_id): Path<FinancingId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_financing(user_id, financing_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        AUDIT_ENTITY,
        Some(financing_id),
        None,
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for the amortization schedule of a financing.
pub async fn get_financing_schedule_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Path(financing_id): Path<FinancingId>,
) -> Result<Json<Vec<ScheduledInstallment>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_schedule(user_id, financing_id, &connection).map(Json)
}

pub async fn list_financing_payments_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Path(financing_id): Path<FinancingId>,
) -> Result<Json<Vec<FinancingPayment>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_financing_payments(user_id, financing_id, &connection).map(Json)
}

/// A route handler for paying the next (or a given) installment.
pub async fn pay_installment_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Path(financing_id): Path<FinancingId>,
    Json(request): Json<PayInstallmentRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let receipt = pay_installment(user_id, financing_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        "financing_payment",
        Some(receipt.payment.id),
        Some(&receipt.payment.amount.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn delete_financing_payment_endpoint(
    State(state): State<FinancingState>,
    Extension(user_id): Extension<UserID>,
    Path(payment_id): Path<FinancingPaymentId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let payment = delete_financing_payment(user_id, payment_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        "financing_payment",
        Some(payment.id),
        Some(&payment.amount.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::StatusCode,
        routing::{delete, get},
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        db::test_utils::must_create_connection_and_user,
        endpoints::{self, format_endpoint},
        financing::{
            create_financing_endpoint, delete_financing_endpoint,
            delete_financing_payment_endpoint, get_financing_endpoint,
            get_financing_schedule_endpoint, list_financing_payments_endpoint,
            list_financings_endpoint, pay_installment_endpoint, update_financing_endpoint,
        },
        test_utils::{assert_error, state_with_connection, with_user},
    };

    fn must_create_server() -> TestServer {
        let (connection, user_id) = must_create_connection_and_user();
        let app = Router::new()
            .route(
                endpoints::FINANCINGS,
                get(list_financings_endpoint).post(create_financing_endpoint),
            )
            .route(
                endpoints::FINANCING,
                get(get_financing_endpoint)
                    .put(update_financing_endpoint)
                    .delete(delete_financing_endpoint),
            )
            .route(
                endpoints::FINANCING_SCHEDULE,
                get(get_financing_schedule_endpoint),
            )
            .route(
                endpoints::FINANCING_PAYMENTS,
                get(list_financing_payments_endpoint).post(pay_installment_endpoint),
            )
            .route(
                endpoints::FINANCING_PAYMENT,
                delete(delete_financing_payment_endpoint),
            )
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));

        TestServer::try_new(app).unwrap()
    }

    fn loan_body() -> Value {
        json!({
            "description": "Car",
            "principal": "1000.00",
            "annual_interest_rate": "12",
            "installments": 12,
            "first_due_date": "2025-01-10",
            "system": "price",
        })
    }

    async fn must_create_loan(server: &TestServer) -> i64 {
        let response = server.post(endpoints::FINANCINGS).json(&loan_body()).await;
        response.assert_status(StatusCode::CREATED);

        response.json::<Value>()["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_returns_summary() {
        let server = must_create_server();

        let response = server.post(endpoints::FINANCINGS).json(&loan_body()).await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["description"], "Car");
        assert_eq!(body["summary"]["paid_installments"], 0);
        assert_eq!(body["summary"]["next_installment"]["number"], 1);
        assert_eq!(body["summary"]["next_installment"]["payment"], "88.85");
    }

    #[tokio::test]
    async fn schedule_has_every_installment() {
        let server = must_create_server();
        let financing_id = must_create_loan(&server).await;

        let response = server
            .get(&format_endpoint(endpoints::FINANCING_SCHEDULE, financing_id))
            .await;

        response.assert_status_ok();
        let rows = response.json::<Vec<Value>>();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0]["due_date"], "2025-01-10");
        assert_eq!(rows[11]["number"], 12);
        assert_eq!(rows[0]["paid"], false);
    }

    #[tokio::test]
    async fn pay_and_undo_installment() {
        let server = must_create_server();
        let financing_id = must_create_loan(&server).await;
        let payments_path = format_endpoint(endpoints::FINANCING_PAYMENTS, financing_id);

        let response = server
            .post(&payments_path)
            .json(&json!({ "date": "2025-01-10" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let receipt = response.json::<Value>();
        assert_eq!(receipt["payment"]["installment_number"], 1);
        assert_eq!(receipt["financing"]["summary"]["paid_installments"], 1);

        let again = server
            .post(&payments_path)
            .json(&json!({ "date": "2025-01-10", "installment_number": 1 }))
            .await;
        assert_error(&again, StatusCode::CONFLICT, "installment 1 has already been paid");

        let payment_id = receipt["payment"]["id"].as_i64().unwrap();
        server
            .delete(&format_endpoint(endpoints::FINANCING_PAYMENT, payment_id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let payments = server.get(&payments_path).await.json::<Vec<Value>>();
        assert!(payments.is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_terms() {
        let server = must_create_server();
        let mut body = loan_body();
        body["installments"] = json!(0);

        let response = server.post(endpoints::FINANCINGS).json(&body).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_financing() {
        let server = must_create_server();
        let financing_id = must_create_loan(&server).await;
        let path = format_endpoint(endpoints::FINANCING, financing_id);

        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server.get(&path).await.assert_status_not_found();
    }
}
