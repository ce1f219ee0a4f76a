//! Savings targets tracked against one investment or the whole portfolio.

use std::collections::HashMap;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    investment::{InvestmentId, ensure_investment},
    money::Money,
    percent::Percent,
    validation::required_text,
};

pub type GoalId = DatabaseId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentGoal {
    pub id: GoalId,
    pub name: String,
    pub target_amount: Money,
    pub target_date: Option<Date>,
    /// The investment the goal tracks, or all investments when `None`.
    pub investment_id: Option<InvestmentId>,
    pub current_amount: Money,
    /// Capped at 100.
    pub progress_percent: Percent,
    pub achieved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoalRequest {
    pub name: String,
    pub target_amount: Money,
    pub target_date: Option<Date>,
    pub investment_id: Option<InvestmentId>,
}

pub fn create_investment_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS investment_goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            target_amount TEXT NOT NULL,
            target_date TEXT,
            investment_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(investment_id) REFERENCES investment(id) ON DELETE SET NULL
        )",
        (),
    )?;

    Ok(())
}

const GOAL_COLUMNS: &str = "id, name, target_amount, target_date, investment_id, created_at";

fn map_row(row: &Row) -> Result<InvestmentGoal, rusqlite::Error> {
    Ok(InvestmentGoal {
        id: row.get(0)?,
        name: row.get(1)?,
        target_amount: row.get(2)?,
        target_date: row.get(3)?,
        investment_id: row.get(4)?,
        current_amount: Money::ZERO,
        progress_percent: Percent::ZERO,
        achieved: false,
        created_at: row.get(5)?,
    })
}

/// The current value of each of the user's investments.
fn get_current_values(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashMap<InvestmentId, Money>, Error> {
    connection
        .prepare("SELECT id, current_value FROM investment WHERE user_id = ?1")?
        .query_map([user_id.as_i64()], |row| {
            Ok((row.get::<_, InvestmentId>(0)?, row.get::<_, Money>(1)?))
        })?
        .map(|value| value.map_err(Error::from))
        .collect()
}

fn apply_progress(goal: &mut InvestmentGoal, values: &HashMap<InvestmentId, Money>) {
    goal.current_amount = match goal.investment_id {
        Some(investment_id) => values.get(&investment_id).copied().unwrap_or_default(),
        None => values.values().copied().sum(),
    };
    goal.progress_percent =
        Percent::of(goal.current_amount.value(), goal.target_amount.value()).cap_at_hundred();
    goal.achieved = goal.current_amount >= goal.target_amount;
}

fn validate_request(
    user_id: UserID,
    request: &GoalRequest,
    connection: &Connection,
) -> Result<(String, Money), Error> {
    let name = required_text(&request.name, "name")?;
    let target_amount = request.target_amount.ensure_positive("target_amount")?;

    if let Some(investment_id) = request.investment_id {
        ensure_investment(user_id, investment_id, connection)?;
    }

    Ok((name, target_amount))
}

/// Create a goal.
///
/// # Errors
/// Returns [Error::Validation] for an empty name or a target that is not positive, and
/// [Error::InvalidInvestment] if the linked investment is not one of the user's.
pub fn create_goal(
    user_id: UserID,
    request: GoalRequest,
    connection: &Connection,
) -> Result<InvestmentGoal, Error> {
    let (name, target_amount) = validate_request(user_id, &request, connection)?;

    let goal_id: GoalId = connection.query_row(
        "INSERT INTO investment_goal (user_id, name, target_amount, target_date, \
        investment_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING id",
        (
            user_id.as_i64(),
            name,
            target_amount,
            request.target_date,
            request.investment_id,
            OffsetDateTime::now_utc(),
        ),
        |row| row.get(0),
    )?;

    get_goal(user_id, goal_id, connection)
}

pub fn get_goal(
    user_id: UserID,
    goal_id: GoalId,
    connection: &Connection,
) -> Result<InvestmentGoal, Error> {
    let mut goal = connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM investment_goal WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((goal_id, user_id.as_i64()), map_row)?;

    apply_progress(&mut goal, &get_current_values(user_id, connection)?);

    Ok(goal)
}

/// Get the user's goals, those with the nearest target date first.
pub fn get_goals(user_id: UserID, connection: &Connection) -> Result<Vec<InvestmentGoal>, Error> {
    let values = get_current_values(user_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM investment_goal WHERE user_id = ?1
            ORDER BY target_date IS NULL, target_date ASC, id ASC"
        ))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|goal| -> Result<InvestmentGoal, Error> {
            let mut goal = goal?;
            apply_progress(&mut goal, &values);
            Ok(goal)
        })
        .collect()
}

pub fn update_goal(
    user_id: UserID,
    goal_id: GoalId,
    request: GoalRequest,
    connection: &Connection,
) -> Result<InvestmentGoal, Error> {
    let (name, target_amount) = validate_request(user_id, &request, connection)?;

    let rows_affected = connection.execute(
        "UPDATE investment_goal
        SET name = ?1, target_amount = ?2, target_date = ?3, investment_id = ?4
        WHERE id = ?5 AND user_id = ?6",
        (
            name,
            target_amount,
            request.target_date,
            request.investment_id,
            goal_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_goal(user_id, goal_id, connection)
}

pub fn delete_goal(user_id: UserID, goal_id: GoalId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM investment_goal WHERE id = ?1 AND user_id = ?2",
        (goal_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
