//! Fixed accounts: recurring bills that are paid on a schedule.

mod core;
mod handlers;
mod payment;
mod schedule;

pub use core::{
    FixedAccount, FixedAccountId, FixedAccountRequest, PayFixedAccountRequest,
    UpcomingOccurrence, create_fixed_account, create_fixed_account_table, delete_fixed_account,
    get_fixed_account, get_fixed_accounts, pay_fixed_account, update_fixed_account,
    upcoming_occurrences,
};
pub(crate) use core::set_next_due_date;
pub use handlers::{
    create_fixed_account_endpoint, delete_fixed_account_endpoint,
    delete_fixed_account_payment_endpoint, get_fixed_account_endpoint,
    list_fixed_account_payments_endpoint, list_fixed_accounts_endpoint,
    pay_fixed_account_endpoint, upcoming_fixed_accounts_endpoint, update_fixed_account_endpoint,
};
pub use payment::{
    PaidOccurrence, PaidOccurrenceId, create_fixed_account_payment_table,
    delete_fixed_account_payment, get_fixed_account_payments,
};
pub(crate) use payment::{get_paid_transaction_ids, record_paid_occurrence};
pub use schedule::{Frequency, next_occurrence, occurrences_until};
