//! Works out how much of a receivable or payable has been settled.

use serde::Serialize;
use time::Date;

use crate::money::Money;

text_enum! {
    /// How far a receivable or payable has been paid off.
    pub enum SettlementStatus {
        Pending => "pending",
        PartiallyPaid => "partially_paid",
        Paid => "paid",
    }
}

/// The state of a receivable or payable derived from its payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub status: SettlementStatus,
    /// Unpaid and the due date has passed.
    pub is_overdue: bool,
}

/// Derive the settlement of an obligation for `amount` from its `payments`.
///
/// The remaining amount never goes below zero, and an obligation that is due today is not yet
/// overdue.
pub fn settle(amount: Money, payments: &[Money], due_date: Date, today: Date) -> Settlement {
    let paid_amount: Money = payments.iter().sum();

    let status = if paid_amount.is_zero() {
        SettlementStatus::Pending
    } else if paid_amount >= amount {
        SettlementStatus::Paid
    } else {
        SettlementStatus::PartiallyPaid
    };

    Settlement {
        paid_amount,
        remaining_amount: (amount - paid_amount).clamp_to_zero(),
        status,
        is_overdue: status != SettlementStatus::Paid && due_date < today,
    }
}
