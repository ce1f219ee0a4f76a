//! The investment, contribution and goal endpoints.

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
    investment::{
        Contribution, ContributionId, ContributionRequest, GoalId, GoalRequest, Investment,
        InvestmentGoal, InvestmentId, InvestmentRequest, InvestmentValueRequest,
        PortfolioSummary, create_contribution, create_goal, create_investment,
        delete_contribution, delete_goal, delete_investment, get_contributions, get_goal,
        get_goals, get_investment, get_investments, get_portfolio_summary, update_goal,
        update_investment, update_investment_value,
    },
};

/// The state needed by the investment endpoints.
#[derive(Debug, Clone)]
pub struct InvestmentState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for InvestmentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn list_investments_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Investment>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_investments(user_id, &connection).map(Json)
}

pub async fn get_investment_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(investment_id): Path<InvestmentId>,
) -> Result<Json<Investment>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_investment(user_id, investment_id, &connection).map(Json)
}

/// A route handler for the portfolio totals and allocation by kind.
pub async fn portfolio_summary_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<PortfolioSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_portfolio_summary(user_id, &connection).map(Json)
}

pub async fn create_investment_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<InvestmentRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let investment = create_investment(user_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        "investment",
        Some(investment.id),
        Some(&investment.name),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(investment)))
}

pub async fn update_investment_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(investment_id): Path<InvestmentId>,
    Json(request): Json<InvestmentRequest>,
) -> Result<Json<Investment>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let investment = update_investment(user_id, investment_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Update,
        "investment",
        Some(investment.id),
        Some(&investment.name),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(investment))
}

/// A route handler for recording the latest market value of an investment.
pub async fn update_investment_value_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(investment_id): Path<InvestmentId>,
    Json(request): Json<InvestmentValueRequest>,
) -> Result<Json<Investment>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let investment = update_investment_value(
        user_id,
        investment_id,
        request.current_value,
        &sql_transaction,
    )?;
    record(
        user_id,
        AuditAction::Update,
        "investment",
        Some(investment.id),
        Some(&investment.current_value.to_string()),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(Json(investment))
}

pub async fn delete_investment_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(investment_id): Path<InvestmentId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    delete_investment(user_id, investment_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        "investment",
        Some(investment_id),
        None,
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_contributions_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(investment_id): Path<InvestmentId>,
) -> Result<Json<Vec<Contribution>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_contributions(user_id, investment_id, &connection).map(Json)
}

pub async fn create_contribution_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(investment_id): Path<InvestmentId>,
    Json(request): Json<ContributionRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let receipt = create_contribution(user_id, investment_id, request, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Create,
        "contribution",
        Some(receipt.contribution.id),
        Some(&format!(
            "{} {}",
            receipt.contribution.kind, receipt.contribution.amount
        )),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn delete_contribution_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(contribution_id): Path<ContributionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let contribution = delete_contribution(user_id, contribution_id, &sql_transaction)?;
    record(
        user_id,
        AuditAction::Delete,
        "contribution",
        Some(contribution.id),
        Some(&format!("{} {}", contribution.kind, contribution.amount)),
        &sql_transaction,
    )?;
    sql_transaction.commit()?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_goals_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<InvestmentGoal>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_goals(user_id, &connection).map(Json)
}

pub async fn get_goal_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<InvestmentGoal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_goal(user_id, goal_id, &connection).map(Json)
}

pub async fn create_goal_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<GoalRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let goal = create_goal(user_id, request, &connection)?;

    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn update_goal_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    Json(request): Json<GoalRequest>,
) -> Result<Json<InvestmentGoal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_goal(user_id, goal_id, request, &connection).map(Json)
}

pub async fn delete_goal_endpoint(
    State(state): State<InvestmentState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_goal(user_id, goal_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
