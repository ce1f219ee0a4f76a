//! Installment loans (financings), their amortization schedules and payments.

mod core;
mod handlers;
mod payment;
mod schedule;

pub use core::{
    Financing, FinancingDetails, FinancingId, FinancingRequest, ScheduledInstallment, create_financing, create_financing_table, delete_financing,
    get_financing, get_financing_summary, get_financings, get_schedule, update_financing,
    with_summary,
};
pub(crate) use core::get_paid_installments;
pub use handlers::{
    create_financing_endpoint, delete_financing_endpoint,
    delete_financing_payment_endpoint, get_financing_endpoint, get_financing_schedule_endpoint,
    list_financing_payments_endpoint, list_financings_endpoint, pay_installment_endpoint,
    update_financing_endpoint,
};
pub use payment::{
    FinancingPayment, FinancingPaymentId, PayInstallmentRequest,
    create_financing_payment_table, delete_financing_payment, get_financing_payments,
    pay_installment,
};
pub use schedule::{AmortizationSystem, Installment, amortization_schedule};
