//! The report endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    db::lock_connection,
    report::{
        CategoryTotal, IncomeExpenseSummary, MonthlyCashFlow, Overview, ReportQuery,
        get_cash_flow_report, get_category_report, get_overview, get_summary_report,
    },
    settings::user_today,
};

/// The state needed by the report endpoints.
#[derive(Debug, Clone)]
pub struct ReportState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the income and expense totals in a date range.
pub async fn summary_report_endpoint(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<IncomeExpenseSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_summary_report(user_id, &query, &connection).map(Json)
}

pub async fn category_report_endpoint(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<CategoryTotal>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category_report(user_id, &query, &connection).map(Json)
}

pub async fn cash_flow_report_endpoint(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<MonthlyCashFlow>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_cash_flow_report(user_id, &query, &connection).map(Json)
}

/// A route handler for the dashboard snapshot, evaluated on the user's local date.
pub async fn overview_endpoint(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Overview>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    get_overview(user_id, today, &connection).map(Json)
}
