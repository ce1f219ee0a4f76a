//! Suppliers and customers.

mod core;
mod handlers;

pub use core::{
    Counterparty, CounterpartyId, CounterpartyKind, CounterpartyQuery, CounterpartyRequest,
    create_counterparty, create_counterparty_table, delete_counterparty, ensure_counterparty,
    get_counterparties, get_counterparty, update_counterparty,
};
pub use handlers::{
    create_counterparty_endpoint, delete_counterparty_endpoint,
    get_counterparty_endpoint, list_counterparties_endpoint, update_counterparty_endpoint,
};
