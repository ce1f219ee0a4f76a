//! Application router configuration with public, protected and admin route definitions.

use axum::{
    Extension, Router, middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};

use crate::{
    AppState, Error,
    account::{
        create_account_endpoint, delete_account_endpoint, get_account_endpoint,
        list_accounts_endpoint, update_account_endpoint,
    },
    admin::{
        admin_audit_log_endpoint, admin_stats_endpoint, change_role_endpoint, list_users_endpoint,
    },
    audit::list_own_audit_log,
    auth::{
        admin_guard, auth_guard, change_password, get_current_user, list_sessions, log_in,
        log_out, register_user,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        list_categories_endpoint, update_category_endpoint,
    },
    counterparty::{
        CounterpartyKind, create_counterparty_endpoint, delete_counterparty_endpoint,
        get_counterparty_endpoint, list_counterparties_endpoint, update_counterparty_endpoint,
    },
    endpoints,
    financing::{
        create_financing_endpoint, delete_financing_endpoint, delete_financing_payment_endpoint,
        get_financing_endpoint, get_financing_schedule_endpoint, list_financing_payments_endpoint,
        list_financings_endpoint, pay_installment_endpoint, update_financing_endpoint,
    },
    fixed_account::{
        create_fixed_account_endpoint, delete_fixed_account_endpoint,
        delete_fixed_account_payment_endpoint, get_fixed_account_endpoint,
        list_fixed_account_payments_endpoint, list_fixed_accounts_endpoint,
        pay_fixed_account_endpoint, upcoming_fixed_accounts_endpoint,
        update_fixed_account_endpoint,
    },
    health::health_endpoint,
    investment::{
        create_contribution_endpoint, create_goal_endpoint, create_investment_endpoint,
        delete_contribution_endpoint, delete_goal_endpoint, delete_investment_endpoint,
        get_goal_endpoint, get_investment_endpoint, list_contributions_endpoint,
        list_goals_endpoint, list_investments_endpoint, portfolio_summary_endpoint,
        update_goal_endpoint, update_investment_endpoint, update_investment_value_endpoint,
    },
    notification::{
        delete_notification_endpoint, list_notifications_endpoint,
        mark_all_notifications_read_endpoint, mark_notification_read_endpoint,
        refresh_notifications_endpoint,
    },
    obligation::{
        Direction, create_obligation_endpoint, create_payment_endpoint,
        delete_obligation_endpoint, delete_payment_endpoint, get_obligation_endpoint,
        list_obligations_endpoint, list_payments_endpoint, update_obligation_endpoint,
    },
    report::{
        cash_flow_report_endpoint, category_report_endpoint, overview_endpoint,
        summary_report_endpoint,
    },
    settings::{get_settings_endpoint, update_settings_endpoint},
    transaction::{
        create_transaction_endpoint, create_transfer_endpoint, delete_transaction_endpoint,
        export_transactions_endpoint, get_transaction_endpoint, list_transactions_endpoint,
        update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route(endpoints::HEALTH, get(health_endpoint))
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(log_in));

    let protected_routes = Router::new()
        .merge(auth_routes())
        .merge(ledger_routes())
        .merge(counterparty_routes(
            endpoints::SUPPLIERS,
            endpoints::SUPPLIER,
            CounterpartyKind::Supplier,
        ))
        .merge(counterparty_routes(
            endpoints::CUSTOMERS,
            endpoints::CUSTOMER,
            CounterpartyKind::Customer,
        ))
        .merge(obligation_routes(
            endpoints::RECEIVABLES,
            endpoints::RECEIVABLE,
            endpoints::RECEIVABLE_PAYMENTS,
            Direction::Receivable,
        ))
        .merge(obligation_routes(
            endpoints::PAYABLES,
            endpoints::PAYABLE,
            endpoints::PAYABLE_PAYMENTS,
            Direction::Payable,
        ))
        .route(endpoints::PAYMENT, delete(delete_payment_endpoint))
        .merge(financing_routes())
        .merge(investment_routes())
        .merge(fixed_account_routes())
        .merge(notification_routes())
        .merge(report_routes())
        .route(
            endpoints::SETTINGS,
            get(get_settings_endpoint).put(update_settings_endpoint),
        )
        .route(endpoints::AUDIT_LOG, get(list_own_audit_log));

    let admin_routes = Router::new()
        .route(endpoints::ADMIN_USERS, get(list_users_endpoint))
        .route(endpoints::ADMIN_USER_ROLE, put(change_role_endpoint))
        .route(endpoints::ADMIN_AUDIT_LOG, get(admin_audit_log_endpoint))
        .route(endpoints::ADMIN_STATS, get(admin_stats_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), admin_guard));

    // The last layer added runs first, so auth_guard runs before admin_guard.
    let protected_routes = protected_routes
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(public_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(endpoints::LOG_OUT, post(log_out))
        .route(endpoints::ME, get(get_current_user))
        .route(endpoints::PASSWORD, put(change_password))
        .route(endpoints::SESSIONS, get(list_sessions))
}

fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint)
                .put(update_account_endpoint)
                .delete(delete_account_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSFERS, post(create_transfer_endpoint))
        .route(
            endpoints::TRANSACTIONS_EXPORT,
            get(export_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
}

/// The supplier and customer routes share their handlers, which read `kind` from the request.
fn counterparty_routes(
    collection: &'static str,
    item: &'static str,
    kind: CounterpartyKind,
) -> Router<AppState> {
    Router::new()
        .route(
            collection,
            get(list_counterparties_endpoint).post(create_counterparty_endpoint),
        )
        .route(
            item,
            get(get_counterparty_endpoint)
                .put(update_counterparty_endpoint)
                .delete(delete_counterparty_endpoint),
        )
        .layer(Extension(kind))
}

/// Same as [counterparty_routes] for receivables and payables.
fn obligation_routes(
    collection: &'static str,
    item: &'static str,
    payments: &'static str,
    direction: Direction,
) -> Router<AppState> {
    Router::new()
        .route(
            collection,
            get(list_obligations_endpoint).post(create_obligation_endpoint),
        )
        .route(
            item,
            get(get_obligation_endpoint)
                .put(update_obligation_endpoint)
                .delete(delete_obligation_endpoint),
        )
        .route(
            payments,
            get(list_payments_endpoint).post(create_payment_endpoint),
        )
        .layer(Extension(direction))
}

fn financing_routes() -> Router<AppState> {
    Router::new()
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
}

fn investment_routes() -> Router<AppState> {
    Router::new()
        .route(
            endpoints::INVESTMENTS,
            get(list_investments_endpoint).post(create_investment_endpoint),
        )
        .route(
            endpoints::INVESTMENTS_SUMMARY,
            get(portfolio_summary_endpoint),
        )
        .route(
            endpoints::INVESTMENT,
            get(get_investment_endpoint)
                .put(update_investment_endpoint)
                .delete(delete_investment_endpoint),
        )
        .route(
            endpoints::INVESTMENT_VALUE,
            put(update_investment_value_endpoint),
        )
        .route(
            endpoints::INVESTMENT_CONTRIBUTIONS,
            get(list_contributions_endpoint).post(create_contribution_endpoint),
        )
        .route(endpoints::CONTRIBUTION, delete(delete_contribution_endpoint))
        .route(
            endpoints::INVESTMENT_GOALS,
            get(list_goals_endpoint).post(create_goal_endpoint),
        )
        .route(
            endpoints::INVESTMENT_GOAL,
            get(get_goal_endpoint)
                .put(update_goal_endpoint)
                .delete(delete_goal_endpoint),
        )
}

fn fixed_account_routes() -> Router<AppState> {
    Router::new()
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
        .route(
            endpoints::FIXED_ACCOUNT_PAY,
            post(pay_fixed_account_endpoint),
        )
        .route(
            endpoints::FIXED_ACCOUNT_PAYMENTS,
            get(list_fixed_account_payments_endpoint),
        )
        .route(
            endpoints::FIXED_ACCOUNT_PAYMENT,
            delete(delete_fixed_account_payment_endpoint),
        )
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(endpoints::NOTIFICATIONS, get(list_notifications_endpoint))
        .route(
            endpoints::NOTIFICATIONS_REFRESH,
            post(refresh_notifications_endpoint),
        )
        .route(
            endpoints::NOTIFICATIONS_READ_ALL,
            put(mark_all_notifications_read_endpoint),
        )
        .route(
            endpoints::NOTIFICATION,
            delete(delete_notification_endpoint),
        )
        .route(
            endpoints::NOTIFICATION_READ,
            put(mark_notification_read_endpoint),
        )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route(endpoints::REPORT_SUMMARY, get(summary_report_endpoint))
        .route(endpoints::REPORT_BY_CATEGORY, get(category_report_endpoint))
        .route(endpoints::REPORT_CASH_FLOW, get(cash_flow_report_endpoint))
        .route(endpoints::REPORT_OVERVIEW, get(overview_endpoint))
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, endpoints, pagination::PaginationConfig, test_utils::assert_error};

    use super::build_router;

    const PASSWORD: &str = "Ph4ntom-Lantern-Quasar-91";

    fn must_create_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        let state =
            AppState::new(connection, "foobar", "Etc/UTC", PaginationConfig::default()).unwrap();

        TestServer::try_new(build_router(state)).unwrap()
    }

    async fn register_and_log_in(server: &TestServer, email: &str) -> String {
        server
            .post(endpoints::REGISTER)
            .json(&json!({ "email": email, "name": "Test User", "password": PASSWORD }))
            .await
            .assert_status(StatusCode::CREATED);

        let body: Value = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await
            .json();

        body["token"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn health_is_public() {
        let server = must_create_server();

        server.get(endpoints::HEALTH).await.assert_status_ok();
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let server = must_create_server();

        let response = server.get(endpoints::ACCOUNTS).await;

        assert_error(&response, StatusCode::UNAUTHORIZED, "invalid or expired token");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let server = must_create_server();

        let response = server.get("/api/does-not-exist").await;

        assert_error(
            &response,
            StatusCode::NOT_FOUND,
            "the requested resource could not be found",
        );
    }

    #[tokio::test]
    async fn token_grants_access() {
        let server = must_create_server();
        let token = register_and_log_in(&server, "test@example.com").await;

        let response = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Checking" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let accounts: Value = server
            .get(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(accounts.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn counterparty_kinds_are_separate() {
        let server = must_create_server();
        let token = register_and_log_in(&server, "test@example.com").await;

        server
            .post(endpoints::SUPPLIERS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Acme" }))
            .await
            .assert_status(StatusCode::CREATED);

        let suppliers: Value = server
            .get(endpoints::SUPPLIERS)
            .authorization_bearer(&token)
            .await
            .json();
        let customers: Value = server
            .get(endpoints::CUSTOMERS)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(suppliers.as_array().unwrap().len(), 1);
        assert!(customers.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_routes_need_admin_role() {
        let server = must_create_server();
        let admin_token = register_and_log_in(&server, "admin@example.com").await;
        let user_token = register_and_log_in(&server, "user@example.com").await;

        server
            .get(endpoints::ADMIN_STATS)
            .authorization_bearer(&admin_token)
            .await
            .assert_status_ok();
        let response = server
            .get(endpoints::ADMIN_STATS)
            .authorization_bearer(&user_token)
            .await;

        assert_error(
            &response,
            StatusCode::FORBIDDEN,
            "you do not have permission to perform this action",
        );
    }

    #[tokio::test]
    async fn log_out_revokes_token() {
        let server = must_create_server();
        let token = register_and_log_in(&server, "test@example.com").await;

        server
            .post(endpoints::LOG_OUT)
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let response = server.get(endpoints::ME).authorization_bearer(&token).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
