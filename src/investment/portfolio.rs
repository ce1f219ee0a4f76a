//! Totals across all of a user's investments.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    investment::{Investment, InvestmentKind, get_investments},
    money::Money,
    percent::Percent,
};

/// The share of the portfolio held in one kind of investment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub kind: InvestmentKind,
    pub current_value: Money,
    pub percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub investment_count: usize,
    pub total_current_value: Money,
    pub total_invested: Money,
    pub total_return: Money,
    pub return_percent: Percent,
    /// Largest holding first.
    pub allocation: Vec<Allocation>,
}

/// Summarise `investments`.
pub fn summarize_portfolio(investments: &[Investment]) -> PortfolioSummary {
    let total_current_value: Money = investments.iter().map(|i| i.current_value).sum();
    let total_invested: Money = investments.iter().map(|i| i.invested_amount).sum();
    let total_return = total_current_value - total_invested;

    let mut by_kind: BTreeMap<&str, (InvestmentKind, Money)> = BTreeMap::new();
    for investment in investments {
        let entry = by_kind
            .entry(investment.kind.as_str())
            .or_insert((investment.kind, Money::ZERO));
        entry.1 += investment.current_value;
    }

    let mut allocation: Vec<Allocation> = by_kind
        .into_values()
        .map(|(kind, current_value)| Allocation {
            kind,
            current_value,
            percent: Percent::of(current_value.value(), total_current_value.value()),
        })
        .collect();
    allocation.sort_by(|a, b| b.current_value.cmp(&a.current_value));

    PortfolioSummary {
        investment_count: investments.len(),
        total_current_value,
        total_invested,
        total_return,
        return_percent: Percent::of(total_return.value(), total_invested.value()),
        allocation,
    }
}

pub fn get_portfolio_summary(
    user_id: UserID,
    connection: &Connection,
) -> Result<PortfolioSummary, Error> {
    get_investments(user_id, connection).map(|investments| summarize_portfolio(&investments))
}
