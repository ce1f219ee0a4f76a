//! Reading the ledger for reports and the financial overview.

use std::collections::HashMap;

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::get_total_account_balance,
    auth::UserID,
    category::{CategoryId, get_categories},
    fixed_account::upcoming_occurrences,
    investment::get_investments,
    money::Money,
    obligation::{Direction, ObligationQuery, SettlementStatus, get_obligations},
    report::{
        CategoryTotal, IncomeExpenseSummary, MonthlyCashFlow, ReportRow, cash_flow, summarize,
        totals_by_category,
    },
    transaction::{TransactionKind, TransactionSource},
};

/// The window of upcoming fixed account payments in the overview.
const OVERVIEW_UPCOMING_DAYS: u32 = 30;

/// The query parameters shared by the reports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    /// Inclusive start date.
    pub from: Option<Date>,
    /// Inclusive end date.
    pub to: Option<Date>,
    /// Only used by the per category report.
    pub kind: Option<TransactionKind>,
}

/// The outstanding amounts of the receivables or payables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObligationTotals {
    /// The number of unpaid or partially paid items.
    pub open_count: usize,
    pub outstanding: Money,
    pub overdue_count: usize,
    pub overdue_amount: Money,
}

/// A snapshot of the user's finances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_balance: Money,
    pub receivables: ObligationTotals,
    pub payables: ObligationTotals,
    pub investments_value: Money,
    /// The total of the fixed account payments due in the next 30 days, overdue ones included.
    pub upcoming_fixed_accounts: Money,
    /// Total balance plus receivables and investments minus payables.
    pub net_worth: Money,
}

/// Get the ledger rows in the query's date range.
///
/// Transfers are left out since they only move money between the user's own accounts.
pub fn get_report_rows(
    user_id: UserID,
    query: &ReportQuery,
    connection: &Connection,
) -> Result<Vec<ReportRow>, Error> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(Error::Validation("from cannot be after to".to_owned()));
        }
    }

    let mut conditions = vec!["user_id = ?".to_owned(), "source != ?".to_owned()];
    let mut params = vec![
        Value::Integer(user_id.as_i64()),
        Value::Text(TransactionSource::Transfer.as_str().to_owned()),
    ];

    if let Some(from) = query.from {
        conditions.push("date >= ?".to_owned());
        params.push(Value::Text(from.to_string()));
    }

    if let Some(to) = query.to {
        conditions.push("date <= ?".to_owned());
        params.push(Value::Text(to.to_string()));
    }

    connection
        .prepare(&format!(
            "SELECT date, kind, amount, category_id FROM \"transaction\" WHERE {}",
            conditions.join(" AND ")
        ))?
        .query_map(params_from_iter(params.iter()), |row| {
            Ok(ReportRow {
                date: row.get(0)?,
                kind: row.get(1)?,
                amount: row.get(2)?,
                category_id: row.get(3)?,
            })
        })?
        .map(|row| row.map_err(Error::from))
        .collect()
}

pub fn get_summary_report(
    user_id: UserID,
    query: &ReportQuery,
    connection: &Connection,
) -> Result<IncomeExpenseSummary, Error> {
    get_report_rows(user_id, query, connection).map(|rows| summarize(&rows))
}

pub fn get_category_report(
    user_id: UserID,
    query: &ReportQuery,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let rows: Vec<ReportRow> = get_report_rows(user_id, query, connection)?
        .into_iter()
        .filter(|row| query.kind.is_none_or(|kind| row.kind == kind))
        .collect();
    let names: HashMap<CategoryId, String> = get_categories(user_id, None, connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();

    Ok(totals_by_category(&rows, &names))
}

pub fn get_cash_flow_report(
    user_id: UserID,
    query: &ReportQuery,
    connection: &Connection,
) -> Result<Vec<MonthlyCashFlow>, Error> {
    let rows = get_report_rows(user_id, query, connection)?;

    cash_flow(&rows, query.from, query.to)
}

fn get_obligation_totals(
    user_id: UserID,
    direction: Direction,
    today: Date,
    connection: &Connection,
) -> Result<ObligationTotals, Error> {
    let mut totals = ObligationTotals {
        open_count: 0,
        outstanding: Money::ZERO,
        overdue_count: 0,
        overdue_amount: Money::ZERO,
    };

    for obligation in get_obligations(
        user_id,
        direction,
        &ObligationQuery::default(),
        today,
        connection,
    )?
    .into_iter()
    .filter(|obligation| obligation.settlement.status != SettlementStatus::Paid)
    {
        totals.open_count += 1;
        totals.outstanding += obligation.settlement.remaining_amount;

        if obligation.settlement.is_overdue {
            totals.overdue_count += 1;
            totals.overdue_amount += obligation.settlement.remaining_amount;
        }
    }

    Ok(totals)
}

pub fn get_overview(user_id: UserID, today: Date, connection: &Connection) -> Result<Overview, Error> {
    let total_balance = get_total_account_balance(user_id, connection)?;
    let receivables = get_obligation_totals(user_id, Direction::Receivable, today, connection)?;
    let payables = get_obligation_totals(user_id, Direction::Payable, today, connection)?;
    let investments_value: Money = get_investments(user_id, connection)?
        .iter()
        .map(|investment| investment.current_value)
        .sum();
    let upcoming_fixed_accounts: Money =
        upcoming_occurrences(user_id, OVERVIEW_UPCOMING_DAYS, today, connection)?
            .iter()
            .map(|occurrence| occurrence.amount)
            .sum();

    Ok(Overview {
        net_worth: total_balance + receivables.outstanding + investments_value
            - payables.outstanding,
        total_balance,
        receivables,
        payables,
        investments_value,
        upcoming_fixed_accounts,
    })
}
