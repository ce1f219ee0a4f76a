//! Receivables and payables with partial payments.

mod core;
mod handlers;
mod payment;
mod settlement;

pub use core::{
    Direction, Obligation, ObligationId, ObligationQuery, ObligationRequest, create_obligation,
    create_obligation_table, delete_obligation, get_obligation, get_obligations,
    update_obligation,
};
pub use handlers::{
    create_obligation_endpoint, create_payment_endpoint,
    delete_obligation_endpoint, delete_payment_endpoint, get_obligation_endpoint,
    list_obligations_endpoint, list_payments_endpoint, update_obligation_endpoint,
};
pub use payment::{
    Payment, PaymentId, PaymentRequest, create_payment, create_payment_table,
    delete_payment, get_payments,
};
pub use settlement::{Settlement, SettlementStatus, settle};
