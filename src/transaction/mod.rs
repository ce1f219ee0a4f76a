//! The ledger: income and expense transactions recorded against accounts.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod export;
mod list_endpoint;
mod query;
mod transfer;

pub use core::{
    Transaction, TransactionBuilder, TransactionId, TransactionKind, TransactionSource,
    count_transactions, create_transaction, create_transaction_table, delete_transaction,
    get_transaction, map_transaction_row, update_transaction,
};
pub(crate) use core::delete_ledger_transaction;
pub use create_endpoint::{TransactionRequest, TransactionState, create_transaction_endpoint};
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::update_transaction_endpoint;
pub use export::export_transactions_endpoint;
pub use list_endpoint::{get_transaction_endpoint, list_transactions_endpoint};
pub use query::{TransactionQuery, get_matching_transactions, get_transactions_page};
pub use transfer::{Transfer, create_transfer_endpoint};
#[cfg(test)]
pub use transfer::{TransferRequest, create_transfer};
