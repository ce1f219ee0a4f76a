//! The API endpoints URIs.
//!
//! Endpoints that take a parameter, e.g., '/api/accounts/{account_id}', are filled in by the router.

/// The route for checking that the server is up.
pub const HEALTH: &str = "/api/health";

/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/log_in";
/// The route for the client to log out the current session.
pub const LOG_OUT: &str = "/api/auth/log_out";
/// The route for getting the current user.
pub const ME: &str = "/api/auth/me";
/// The route for changing the current user's password.
pub const PASSWORD: &str = "/api/auth/password";
/// The route for listing the current user's active sessions.
pub const SESSIONS: &str = "/api/auth/sessions";

/// The route to access accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to access a single account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";

/// The route to access categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to access a single category.
pub const CATEGORY: &str = "/api/categories/{category_id}";

/// The route to access transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to move money between two accounts.
pub const TRANSFERS: &str = "/api/transactions/transfer";
/// The route to download transactions as a CSV file.
pub const TRANSACTIONS_EXPORT: &str = "/api/transactions/export";

/// The route to access suppliers.
pub const SUPPLIERS: &str = "/api/suppliers";
/// The route to access a single supplier.
pub const SUPPLIER: &str = "/api/suppliers/{counterparty_id}";
/// The route to access customers.
pub const CUSTOMERS: &str = "/api/customers";
/// The route to access a single customer.
pub const CUSTOMER: &str = "/api/customers/{counterparty_id}";

/// The route to access receivables.
pub const RECEIVABLES: &str = "/api/receivables";
/// The route to access a single receivable.
pub const RECEIVABLE: &str = "/api/receivables/{obligation_id}";
/// The route to access the payments of a receivable.
pub const RECEIVABLE_PAYMENTS: &str = "/api/receivables/{obligation_id}/payments";
/// The route to access payables.
pub const PAYABLES: &str = "/api/payables";
/// The route to access a single payable.
pub const PAYABLE: &str = "/api/payables/{obligation_id}";
/// The route to access the payments of a payable.
pub const PAYABLE_PAYMENTS: &str = "/api/payables/{obligation_id}/payments";
/// The route to delete a receivable or payable payment.
pub const PAYMENT: &str = "/api/payments/{payment_id}";

/// The route to access financings.
pub const FINANCINGS: &str = "/api/financings";
/// The route to access a single financing.
pub const FINANCING: &str = "/api/financings/{financing_id}";
/// The route to get the amortization schedule of a financing.
pub const FINANCING_SCHEDULE: &str = "/api/financings/{financing_id}/schedule";
/// The route to access the installment payments of a financing.
pub const FINANCING_PAYMENTS: &str = "/api/financings/{financing_id}/payments";
/// The route to delete an installment payment.
pub const FINANCING_PAYMENT: &str = "/api/financing-payments/{payment_id}";

/// The route to access investments.
pub const INVESTMENTS: &str = "/api/investments";
/// The route to get totals across all investments.
pub const INVESTMENTS_SUMMARY: &str = "/api/investments/summary";
/// The route to access a single investment.
pub const INVESTMENT: &str = "/api/investments/{investment_id}";
/// The route to update the current value of an investment.
pub const INVESTMENT_VALUE: &str = "/api/investments/{investment_id}/value";
/// The route to access the contributions to an investment.
pub const INVESTMENT_CONTRIBUTIONS: &str = "/api/investments/{investment_id}/contributions";
/// The route to delete a contribution.
pub const CONTRIBUTION: &str = "/api/contributions/{contribution_id}";
/// The route to access investment goals.
pub const INVESTMENT_GOALS: &str = "/api/investment-goals";
/// The route to access a single investment goal.
pub const INVESTMENT_GOAL: &str = "/api/investment-goals/{goal_id}";

/// The route to access fixed accounts (recurring bills).
pub const FIXED_ACCOUNTS: &str = "/api/fixed-accounts";
/// The route to list the fixed account occurrences that are due soon.
pub const FIXED_ACCOUNTS_UPCOMING: &str = "/api/fixed-accounts/upcoming";
/// The route to access a single fixed account.
pub const FIXED_ACCOUNT: &str = "/api/fixed-accounts/{fixed_account_id}";
/// The route to pay the current occurrence of a fixed account.
pub const FIXED_ACCOUNT_PAY: &str = "/api/fixed-accounts/{fixed_account_id}/pay";
/// The route to list the paid occurrences of a fixed account.
pub const FIXED_ACCOUNT_PAYMENTS: &str = "/api/fixed-accounts/{fixed_account_id}/payments";
/// The route to undo the latest payment of a fixed account.
pub const FIXED_ACCOUNT_PAYMENT: &str = "/api/fixed-account-payments/{payment_id}";

/// The route to access notifications.
pub const NOTIFICATIONS: &str = "/api/notifications";
/// The route to generate notifications for upcoming due dates.
pub const NOTIFICATIONS_REFRESH: &str = "/api/notifications/refresh";
/// The route to mark all notifications as read.
pub const NOTIFICATIONS_READ_ALL: &str = "/api/notifications/read-all";
/// The route to delete a notification.
pub const NOTIFICATION: &str = "/api/notifications/{notification_id}";
/// The route to mark a notification as read.
pub const NOTIFICATION_READ: &str = "/api/notifications/{notification_id}/read";

/// The route to access the current user's settings.
pub const SETTINGS: &str = "/api/settings";

/// The route for the income and expense totals report.
pub const REPORT_SUMMARY: &str = "/api/reports/summary";
/// The route for the per category report.
pub const REPORT_BY_CATEGORY: &str = "/api/reports/by-category";
/// The route for the monthly cash flow report.
pub const REPORT_CASH_FLOW: &str = "/api/reports/cash-flow";
/// The route for the financial overview.
pub const REPORT_OVERVIEW: &str = "/api/reports/overview";

/// The route for the current user's audit log.
pub const AUDIT_LOG: &str = "/api/audit-log";

/// The route for listing all users (admin only).
pub const ADMIN_USERS: &str = "/api/admin/users";
/// The route for changing a user's role (admin only).
pub const ADMIN_USER_ROLE: &str = "/api/admin/users/{user_id}/role";
/// The route for the audit log of all users (admin only).
pub const ADMIN_AUDIT_LOG: &str = "/api/admin/audit-log";
/// The route for usage statistics (admin only).
pub const ADMIN_STATS: &str = "/api/admin/stats";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
