//! Amortization schedules for installment loans.

use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{Error, dates::add_months, money::Money, percent::Percent};

text_enum! {
    /// How the principal is paid off over the installments.
    pub enum AmortizationSystem {
        /// Constant payments (the French or Price table system).
        Price => "price",
        /// Constant amortization with falling payments.
        Sac => "sac",
    }
}

/// One row of an amortization schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Installment {
    /// The 1-based installment number.
    pub number: u32,
    pub due_date: Date,
    /// The total amount due, interest plus amortization.
    pub payment: Money,
    pub interest: Money,
    /// The part of the payment that pays off the principal.
    pub amortization: Money,
    /// The principal left after this installment.
    pub balance: Money,
}

/// `base` raised to the power of `exponent`, or `None` on overflow.
fn power(base: Decimal, exponent: u32) -> Option<Decimal> {
    (0..exponent).try_fold(Decimal::ONE, |result, _| result.checked_mul(base))
}

fn too_large() -> Error {
    Error::Validation(
        "the interest rate and number of installments give payments too large to compute"
            .to_owned(),
    )
}

fn round(value: Decimal) -> Money {
    Money::new(value).round_to_cents()
}

/// Build the schedule for paying off `principal` over `installments` monthly payments.
///
/// The monthly rate is the annual rate divided by twelve. Amounts are rounded to cents and the
/// last installment takes up any rounding difference so that the final balance is exactly zero.
/// Installments fall due monthly starting at `first_due_date`.
///
/// # Errors
/// Returns [Error::Validation] if `installments` is zero, a due date is out of range, or the
/// payments overflow.
pub fn amortization_schedule(
    principal: Money,
    annual_interest_rate: Percent,
    installments: u32,
    first_due_date: Date,
    system: AmortizationSystem,
) -> Result<Vec<Installment>, Error> {
    if installments == 0 {
        return Err(Error::Validation(
            "installments must be at least 1".to_owned(),
        ));
    }

    let monthly_rate = annual_interest_rate.as_fraction() / Decimal::from(12);
    let count = Decimal::from(installments);

    let fixed_payment = if monthly_rate.is_zero() {
        round(principal.value() / count)
    } else {
        let growth = power(Decimal::ONE + monthly_rate, installments).ok_or_else(too_large)?;
        let annuity_factor = growth
            .checked_div(growth - Decimal::ONE)
            .and_then(|factor| factor.checked_mul(monthly_rate))
            .ok_or_else(too_large)?;
        round(
            principal
                .value()
                .checked_mul(annuity_factor)
                .ok_or_else(too_large)?,
        )
    };
    let fixed_amortization = round(principal.value() / count);

    let mut balance = principal;
    let mut schedule = Vec::with_capacity(installments as usize);

    for number in 1..=installments {
        let interest = round(
            balance
                .value()
                .checked_mul(monthly_rate)
                .ok_or_else(too_large)?,
        );

        let amortization = if number == installments {
            balance
        } else {
            match system {
                AmortizationSystem::Price => fixed_payment - interest,
                AmortizationSystem::Sac => fixed_amortization,
            }
        };

        balance -= amortization;

        schedule.push(Installment {
            number,
            due_date: add_months(first_due_date, number - 1)?,
            payment: amortization + interest,
            interest,
            amortization,
            balance,
        });
    }

    Ok(schedule)
}
