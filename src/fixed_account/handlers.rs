//! The fixed account endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    audit::{AuditAction, record},
    auth::UserID,
    db::lock_connection,
    fixed_account::{
        FixedAccount, FixedAccountId, FixedAccountRequest, PaidOccurrence, PaidOccurrenceId,
        PayFixedAccountRequest, UpcomingOccurrence, create_fixed_account, delete_fixed_account,
        delete_fixed_account_payment, get_fixed_account, get_fixed_account_payments,
        get_fixed_accounts, pay_fixed_account, update_fixed_account, upcoming_occurrences,
    },
    settings::user_today,
};

const AUDIT_ENTITY: &str = "fixed_account";
const PAYMENT_AUDIT_ENTITY: &str = "fixed_account_payment";

/// The default window of `GET /api/fixed-accounts/upcoming`.
const DEFAULT_UPCOMING_DAYS: u32 = 30;

/// The state needed by the fixed account endpoints.
#[derive(Debug, Clone)]
pub struct FixedAccountState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for FixedAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<u32>,
}

pub async fn list_fixed_accounts_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<FixedAccount>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_fixed_accounts(user_id, &connection).map(Json)
}

pub async fn get_fixed_account_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Path(fixed_account_id): Path<FixedAccountId>,
) -> Result<Json<FixedAccount>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_fixed_account(user_id, fixed_account_id, &connection).map(Json)
}

pub async fn create_fixed_account_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<FixedAccountRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let fixed_account = create_fixed_account(user_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        AUDIT_ENTITY,
        Some(fixed_account.id),
        Some(&fixed_account.description),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(fixed_account)))
}

pub async fn update_fixed_account_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Path(fixed_account_id): Path<FixedAccountId>,
    Json(request): Json<FixedAccountRequest>,
) -> Result<Json<FixedAccount>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let fixed_account = update_fixed_account(user_id, fixed_account_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Update,
        AUDIT_ENTITY,
        Some(fixed_account.id),
        Some(&fixed_account.description),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(fixed_account))
}

pub async fn delete_fixed_account_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Path(fixed_account_id): Path<FixedAccountId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_fixed_account(user_id, fixed_account_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        AUDIT_ENTITY,
        Some(fixed_account_id),
        None,
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for paying the current occurrence of a fixed account.
///
/// The body is optional, an empty request pays the usual amount today.
pub async fn pay_fixed_account_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Path(fixed_account_id): Path<FixedAccountId>,
    request: Option<Json<PayFixedAccountRequest>>,
) -> Result<impl IntoResponse, Error> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let payment = pay_fixed_account(user_id, fixed_account_id, request, today, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        PAYMENT_AUDIT_ENTITY,
        Some(payment.payment.id),
        Some(&payment.transaction.amount.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_fixed_account_payments_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Path(fixed_account_id): Path<FixedAccountId>,
) -> Result<Json<Vec<PaidOccurrence>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_fixed_account_payments(user_id, fixed_account_id, &connection).map(Json)
}

/// A route handler for undoing the latest payment of a fixed account.
///
/// Responds with the fixed account after its due date moved back.
pub async fn delete_fixed_account_payment_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Path(payment_id): Path<PaidOccurrenceId>,
) -> Result<Json<FixedAccount>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let (payment, fixed_account) =
        delete_fixed_account_payment(user_id, payment_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        PAYMENT_AUDIT_ENTITY,
        Some(payment.id),
        Some(&payment.due_date.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(fixed_account))
}

/// A route handler for the occurrences due in the next `days` days (30 by default).
pub async fn upcoming_fixed_accounts_endpoint(
    State(state): State<FixedAccountState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<UpcomingOccurrence>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    upcoming_occurrences(
        user_id,
        query.days.unwrap_or(DEFAULT_UPCOMING_DAYS),
        today,
        &connection,
    )
    .map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::StatusCode,
        routing::{delete, get, post},
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use time::{Duration, OffsetDateTime};

    use crate::{
        account::{AccountRequest, create_account},
        db::test_utils::must_create_connection_and_user,
        endpoints::{self, format_endpoint},
        fixed_account::{
            create_fixed_account_endpoint, delete_fixed_account_endpoint,
            delete_fixed_account_payment_endpoint, get_fixed_account_endpoint,
            list_fixed_account_payments_endpoint, list_fixed_accounts_endpoint,
            pay_fixed_account_endpoint, upcoming_fixed_accounts_endpoint,
            update_fixed_account_endpoint,
        },
        test_utils::{assert_error, state_with_connection, with_user},
    };

    fn must_create_server() -> (TestServer, i64) {
        let (connection, user_id) = must_create_connection_and_user();
        let account = create_account(user_id, AccountRequest::named("Checking"), &connection)
            .unwrap();
        let app = Router::new()
            .route(
                endpoints::FIXED_ACCOUNTS,
                get(list_fixed_accounts_endpoint).post(create_fixed_account_endpoint),
            )
            .route(
                endpoints::FIXED_ACCOUNTS_UPCOMING,
                get(upcoming_fixed_accounts_endpoint),
            )
            .route(
                endpoints::FIXED_ACCOUNT,
                get(get_fixed_account_endpoint)
                    .put(update_fixed_account_endpoint)
                    .delete(delete_fixed_account_endpoint),
            )
            .route(endpoints::FIXED_ACCOUNT_PAY, post(pay_fixed_account_endpoint))
            .route(
                endpoints::FIXED_ACCOUNT_PAYMENTS,
                get(list_fixed_account_payments_endpoint),
            )
            .route(
                endpoints::FIXED_ACCOUNT_PAYMENT,
                delete(delete_fixed_account_payment_endpoint),
            )
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));

        (TestServer::try_new(app).unwrap(), account.id)
    }

    async fn must_create_bill(server: &TestServer, body: Value) -> Value {
        let response = server.post(endpoints::FIXED_ACCOUNTS).json(&body).await;
        response.assert_status(StatusCode::CREATED);

        response.json()
    }

    #[tokio::test]
    async fn pay_with_empty_body() {
        let (server, account_id) = must_create_server();
        let bill = must_create_bill(
            &server,
            json!({
                "description": "Internet",
                "amount": "99.90",
                "frequency": "monthly",
                "start_date": "2025-01-15",
                "account_id": account_id,
            }),
        )
        .await;
        let bill_id = bill["id"].as_i64().unwrap();

        let response = server
            .post(&format_endpoint(endpoints::FIXED_ACCOUNT_PAY, bill_id))
            .await;

        response.assert_status(StatusCode::CREATED);
        let payment = response.json::<Value>();
        assert_eq!(payment["transaction"]["amount"], "99.90");
        assert_eq!(payment["transaction"]["source"], "fixed_account");
        assert_eq!(payment["fixed_account"]["next_due_date"], "2025-02-15");
    }

    #[tokio::test]
    async fn undo_payment_moves_due_date_back() {
        let (server, account_id) = must_create_server();
        let bill = must_create_bill(
            &server,
            json!({
                "description": "Internet",
                "amount": "99.90",
                "frequency": "monthly",
                "start_date": "2025-01-15",
                "account_id": account_id,
            }),
        )
        .await;
        let bill_id = bill["id"].as_i64().unwrap();
        let first = server
            .post(&format_endpoint(endpoints::FIXED_ACCOUNT_PAY, bill_id))
            .await
            .json::<Value>();
        let second = server
            .post(&format_endpoint(endpoints::FIXED_ACCOUNT_PAY, bill_id))
            .await
            .json::<Value>();

        let payments = server
            .get(&format_endpoint(endpoints::FIXED_ACCOUNT_PAYMENTS, bill_id))
            .await
            .json::<Vec<Value>>();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0]["due_date"], "2025-02-15");

        let response = server
            .delete(&format_endpoint(
                endpoints::FIXED_ACCOUNT_PAYMENT,
                first["payment"]["id"].as_i64().unwrap(),
            ))
            .await;
        assert_error(
            &response,
            StatusCode::CONFLICT,
            "only the latest payment of a fixed account can be deleted",
        );

        let response = server
            .delete(&format_endpoint(
                endpoints::FIXED_ACCOUNT_PAYMENT,
                second["payment"]["id"].as_i64().unwrap(),
            ))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["next_due_date"], "2025-02-15");
    }

    #[tokio::test]
    async fn paying_inactive_bill_is_conflict() {
        let (server, account_id) = must_create_server();
        let bill = must_create_bill(
            &server,
            json!({
                "description": "Old gym",
                "amount": "50.00",
                "frequency": "monthly",
                "start_date": "2025-01-15",
                "account_id": account_id,
                "active": false,
            }),
        )
        .await;

        let response = server
            .post(&format_endpoint(
                endpoints::FIXED_ACCOUNT_PAY,
                bill["id"].as_i64().unwrap(),
            ))
            .json(&json!({ "amount": "10.00" }))
            .await;

        assert_error(
            &response,
            StatusCode::CONFLICT,
            "the fixed account is not active",
        );
    }

    #[tokio::test]
    async fn upcoming_uses_window() {
        let (server, account_id) = must_create_server();
        let start = OffsetDateTime::now_utc().date() + Duration::days(10);
        must_create_bill(
            &server,
            json!({
                "description": "Streaming",
                "amount": "20.00",
                "frequency": "weekly",
                "start_date": start.to_string(),
                "account_id": account_id,
            }),
        )
        .await;

        let week = server
            .get(endpoints::FIXED_ACCOUNTS_UPCOMING)
            .add_query_param("days", 7)
            .await
            .json::<Vec<Value>>();
        let month = server
            .get(endpoints::FIXED_ACCOUNTS_UPCOMING)
            .await
            .json::<Vec<Value>>();

        assert!(week.is_empty());
        assert_eq!(month.len(), 3);
    }

    #[tokio::test]
    async fn crud() {
        let (server, account_id) = must_create_server();
        let bill = must_create_bill(
            &server,
            json!({
                "description": "Insurance",
                "amount": "300.00",
                "frequency": "yearly",
                "start_date": "2025-06-01",
                "account_id": account_id,
            }),
        )
        .await;
        let path = format_endpoint(endpoints::FIXED_ACCOUNT, bill["id"].as_i64().unwrap());

        let updated = server
            .put(&path)
            .json(&json!({
                "description": "Car insurance",
                "amount": "320.00",
                "frequency": "yearly",
                "start_date": "2025-06-01",
                "account_id": account_id,
            }))
            .await
            .json::<Value>();
        assert_eq!(updated["description"], "Car insurance");

        let list = server
            .get(endpoints::FIXED_ACCOUNTS)
            .await
            .json::<Vec<Value>>();
        assert_eq!(list.len(), 1);

        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server.get(&path).await.assert_status_not_found();
    }
}
