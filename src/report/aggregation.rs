//! Totals of ledger rows by kind, category and month.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::Date;

use crate::{
    Error,
    category::CategoryId,
    dates::{add_months, month_start},
    money::Money,
    percent::Percent,
    transaction::TransactionKind,
};

/// The parts of a transaction the reports need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportRow {
    pub date: Date,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeExpenseSummary {
    pub income: Money,
    pub expense: Money,
    /// Income minus expense.
    pub net: Money,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category_id: CategoryId,
    pub name: String,
    pub kind: TransactionKind,
    pub total: Money,
    pub transaction_count: usize,
    /// The share of all rows of the same kind.
    pub percent: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCashFlow {
    /// The first day of the month.
    pub month: Date,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
}

/// The most months a cash flow report may cover, ten years.
pub const MAX_CASH_FLOW_MONTHS: usize = 120;

pub fn summarize(rows: &[ReportRow]) -> IncomeExpenseSummary {
    let mut income = Money::ZERO;
    let mut expense = Money::ZERO;

    for row in rows {
        match row.kind {
            TransactionKind::Income => income += row.amount,
            TransactionKind::Expense => expense += row.amount,
        }
    }

    IncomeExpenseSummary {
        income,
        expense,
        net: income - expense,
        transaction_count: rows.len(),
    }
}

/// Sum the rows per category, largest total first.
///
/// `names` maps category IDs to their names, rows of unknown categories are skipped.
pub fn totals_by_category(
    rows: &[ReportRow],
    names: &HashMap<CategoryId, String>,
) -> Vec<CategoryTotal> {
    let mut totals: HashMap<(CategoryId, TransactionKind), (Money, usize)> = HashMap::new();
    let mut kind_totals: HashMap<TransactionKind, Money> = HashMap::new();

    for row in rows {
        let entry = totals.entry((row.category_id, row.kind)).or_default();
        entry.0 += row.amount;
        entry.1 += 1;
        *kind_totals.entry(row.kind).or_default() += row.amount;
    }

    let mut categories: Vec<CategoryTotal> = totals
        .into_iter()
        .filter_map(|((category_id, kind), (total, transaction_count))| {
            let name = names.get(&category_id)?;
            let kind_total = kind_totals.get(&kind).copied().unwrap_or_default();

            Some(CategoryTotal {
                category_id,
                name: name.clone(),
                kind,
                total,
                transaction_count,
                percent: Percent::of(total.value(), kind_total.value()),
            })
        })
        .collect();

    categories.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.name.cmp(&b.name))
    });

    categories
}

/// Income, expense and net per month.
///
/// Every month from `from` (or the earliest row) to `to` (or the latest row) is listed, including
/// the months without any rows.
///
/// # Errors
/// Returns [Error::Validation] if the range covers more than [MAX_CASH_FLOW_MONTHS] months.
pub fn cash_flow(
    rows: &[ReportRow],
    from: Option<Date>,
    to: Option<Date>,
) -> Result<Vec<MonthlyCashFlow>, Error> {
    let mut months: BTreeMap<Date, (Money, Money)> = BTreeMap::new();

    for row in rows {
        let entry = months.entry(month_start(row.date)).or_default();
        match row.kind {
            TransactionKind::Income => entry.0 += row.amount,
            TransactionKind::Expense => entry.1 += row.amount,
        }
    }

    let first = from
        .map(month_start)
        .or_else(|| months.keys().next().copied());
    let last = to
        .map(month_start)
        .or_else(|| months.keys().next_back().copied());

    let (Some(first), Some(last)) = (first, last) else {
        return Ok(Vec::new());
    };

    let mut flows = Vec::new();
    let mut month = first;

    while month <= last {
        if flows.len() == MAX_CASH_FLOW_MONTHS {
            return Err(Error::Validation(format!(
                "the cash flow report cannot cover more than {MAX_CASH_FLOW_MONTHS} months"
            )));
        }

        let (income, expense) = months.get(&month).copied().unwrap_or_default();
        flows.push(MonthlyCashFlow {
            month,
            income,
            expense,
            net: income - expense,
        });
        month = add_months(month, 1)?;
    }

    Ok(flows)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, str::FromStr};

    use time::{Date, macros::date};

    use crate::{money::Money, percent::Percent, transaction::TransactionKind};

    use super::{ReportRow, cash_flow, summarize, totals_by_category};

    fn row(date: Date, kind: TransactionKind, cents: i64, category_id: i64) -> ReportRow {
        ReportRow {
            date,
            kind,
            amount: Money::from_cents(cents),
            category_id,
        }
    }

    fn rows() -> Vec<ReportRow> {
        vec![
            row(date!(2025 - 01 - 05), TransactionKind::Income, 500_000, 1),
            row(date!(2025 - 01 - 10), TransactionKind::Expense, 30_000, 2),
            row(date!(2025 - 01 - 20), TransactionKind::Expense, 10_000, 3),
            row(date!(2025 - 03 - 02), TransactionKind::Expense, 60_000, 2),
        ]
    }

    #[test]
    fn summary_totals() {
        let summary = summarize(&rows());

        assert_eq!(summary.income, Money::from_cents(500_000));
        assert_eq!(summary.expense, Money::from_cents(100_000));
        assert_eq!(summary.net, Money::from_cents(400_000));
        assert_eq!(summary.transaction_count, 4);
    }

    #[test]
    fn category_totals_sorted_descending() {
        let names = HashMap::from([
            (1, "Salary".to_owned()),
            (2, "Groceries".to_owned()),
            (3, "Transport".to_owned()),
        ]);

        let totals = totals_by_category(&rows(), &names);

        let order: Vec<_> = totals.iter().map(|total| total.name.as_str()).collect();
        assert_eq!(order, ["Salary", "Groceries", "Transport"]);
        assert_eq!(totals[1].transaction_count, 2);
        assert_eq!(totals[1].percent, Percent::from_str("90").unwrap());
        assert_eq!(totals[0].percent, Percent::from_str("100").unwrap());
    }

    #[test]
    fn cash_flow_fills_empty_months() {
        let flows = cash_flow(&rows(), None, None).unwrap();

        let months: Vec<_> = flows.iter().map(|flow| flow.month).collect();
        assert_eq!(
            months,
            [date!(2025 - 01 - 01), date!(2025 - 02 - 01), date!(2025 - 03 - 01)]
        );
        assert_eq!(flows[0].net, Money::from_cents(460_000));
        assert_eq!(flows[1].net, Money::ZERO);
        assert_eq!(flows[2].net, Money::from_cents(-60_000));
    }

    #[test]
    fn cash_flow_uses_range_and_limits_length() {
        let flows = cash_flow(&[], Some(date!(2025 - 01 - 15)), Some(date!(2025 - 02 - 01)))
            .unwrap();
        assert_eq!(flows.len(), 2);

        assert!(cash_flow(&[], Some(date!(2000 - 01 - 01)), Some(date!(2025 - 01 - 01))).is_err());
        assert!(cash_flow(&[], None, None).unwrap().is_empty());
    }
}
