//! Bank accounts, wallets and credit cards, with balances derived from the ledger.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use core::{
    Account, AccountId, AccountRequest, create_account, create_account_table,
    delete_account, ensure_account, get_account, get_accounts, get_total_account_balance,
    update_account,
};
pub use create_endpoint::{AccountState, create_account_endpoint};
pub use delete_endpoint::delete_account_endpoint;
pub use edit_endpoint::update_account_endpoint;
pub use list_endpoint::{get_account_endpoint, list_accounts_endpoint};
