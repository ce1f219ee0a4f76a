//! Income and expense reports, cash flow and the financial overview.

mod aggregation;
mod core;
mod handlers;

pub use aggregation::{
    CategoryTotal, IncomeExpenseSummary, MonthlyCashFlow, ReportRow,
    cash_flow, summarize, totals_by_category,
};
pub use core::{
    Overview, ReportQuery, get_cash_flow_report, get_category_report,
    get_overview, get_summary_report,
};
pub use handlers::{
    cash_flow_report_endpoint, category_report_endpoint, overview_endpoint,
    summary_report_endpoint,
};
