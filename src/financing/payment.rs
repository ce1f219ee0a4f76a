//! Paying the installments of a financing.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::AccountId,
    auth::UserID,
    database_id::DatabaseId,
    financing::{FinancingDetails, FinancingId, get_financing, get_paid_installments, with_summary},
    money::Money,
    transaction::{
        Transaction, TransactionId, TransactionKind, TransactionSource, create_transaction,
        delete_ledger_transaction,
    },
};

pub type FinancingPaymentId = DatabaseId;

/// A paid installment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancingPayment {
    pub id: FinancingPaymentId,
    pub financing_id: FinancingId,
    pub installment_number: u32,
    pub amount: Money,
    pub date: Date,
    pub account_id: Option<AccountId>,
    pub transaction_id: Option<TransactionId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for paying an installment.
#[derive(Debug, Clone, Deserialize)]
pub struct PayInstallmentRequest {
    /// Defaults to the first unpaid installment.
    pub installment_number: Option<u32>,
    /// Defaults to the scheduled payment, may differ for early payoff discounts or late fees.
    pub amount: Option<Money>,
    pub date: Date,
    /// Defaults to the financing's account. Without either no ledger transaction is written.
    pub account_id: Option<AccountId>,
}

/// A new installment payment and the financing it was applied to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallmentReceipt {
    pub payment: FinancingPayment,
    pub financing: FinancingDetails,
}

pub fn create_financing_payment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS financing_payment (
            id INTEGER PRIMARY KEY,
            financing_id INTEGER NOT NULL,
            installment_number INTEGER NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            account_id INTEGER,
            transaction_id INTEGER,
            created_at TEXT NOT NULL,
            UNIQUE(financing_id, installment_number),
            FOREIGN KEY(financing_id) REFERENCES financing(id) ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id)
        )",
        (),
    )?;

    Ok(())
}

const COLUMNS: &str =
    "id, financing_id, installment_number, amount, date, account_id, transaction_id, created_at";

fn map_row(row: &Row) -> Result<FinancingPayment, rusqlite::Error> {
    Ok(FinancingPayment {
        id: row.get(0)?,
        financing_id: row.get(1)?,
        installment_number: row.get(2)?,
        amount: row.get(3)?,
        date: row.get(4)?,
        account_id: row.get(5)?,
        transaction_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Pay one installment of a financing.
///
/// Callers should run this inside a SQL transaction so that the payment and its ledger
/// transaction are saved together.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the financing does not exist,
/// - [Error::FinancingSettled] if every installment is paid,
/// - [Error::InvalidInstallment] if the number is not in the schedule,
/// - [Error::InstallmentAlreadyPaid] if the installment was paid before,
/// - [Error::Validation] if the amount is not positive,
/// - the errors of [create_transaction] for the ledger transaction.
pub fn pay_installment(
    user_id: UserID,
    financing_id: FinancingId,
    request: PayInstallmentRequest,
    connection: &Connection,
) -> Result<InstallmentReceipt, Error> {
    let financing = get_financing(user_id, financing_id, connection)?;
    let schedule = financing.schedule()?;
    let (paid, _) = get_paid_installments(financing_id, connection)?;

    if paid.len() >= schedule.len() {
        return Err(Error::FinancingSettled);
    }

    let installment = match request.installment_number {
        Some(number) => {
            let installment = schedule
                .iter()
                .find(|installment| installment.number == number)
                .ok_or(Error::InvalidInstallment(number))?;

            if paid.contains(&number) {
                return Err(Error::InstallmentAlreadyPaid(number));
            }

            installment
        }
        None => schedule
            .iter()
            .find(|installment| !paid.contains(&installment.number))
            .ok_or(Error::FinancingSettled)?,
    };

    let amount = request
        .amount
        .unwrap_or(installment.payment)
        .ensure_positive("amount")?;
    let account_id = request.account_id.or(financing.account_id);

    let transaction_id = match account_id {
        Some(account_id) => {
            let transaction = create_transaction(
                user_id,
                Transaction::build(
                    account_id,
                    TransactionKind::Expense,
                    amount,
                    request.date,
                    &format!(
                        "{} installment {}/{}",
                        financing.description, installment.number, financing.installments
                    ),
                )
                .category_id(financing.category_id)
                .source(TransactionSource::Financing),
                connection,
            )?;
            Some(transaction.id)
        }
        None => None,
    };

    let payment = connection
        .prepare(&format!(
            "INSERT INTO financing_payment (financing_id, installment_number, amount, date, \
            account_id, transaction_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING {COLUMNS}"
        ))?
        .query_row(
            (
                financing_id,
                installment.number,
                amount,
                request.date,
                account_id,
                transaction_id,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )?;

    tracing::debug!(
        "paid installment {} of financing {financing_id}",
        installment.number
    );

    Ok(InstallmentReceipt {
        payment,
        financing: with_summary(financing, connection)?,
    })
}

/// Get the paid installments of a financing in installment order.
pub fn get_financing_payments(
    user_id: UserID,
    financing_id: FinancingId,
    connection: &Connection,
) -> Result<Vec<FinancingPayment>, Error> {
    get_financing(user_id, financing_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM financing_payment WHERE financing_id = ?1
            ORDER BY installment_number ASC"
        ))?
        .query_map([financing_id], map_row)?
        .map(|payment| payment.map_err(Error::from))
        .collect()
}

/// Undo an installment payment and delete its ledger transaction.
pub fn delete_financing_payment(
    user_id: UserID,
    payment_id: FinancingPaymentId,
    connection: &Connection,
) -> Result<FinancingPayment, Error> {
    let payment = connection
        .prepare(&format!(
            "DELETE FROM financing_payment
            WHERE id = ?1
                AND financing_id IN (SELECT id FROM financing WHERE user_id = ?2)
            RETURNING {COLUMNS}"
        ))?
        .query_row((payment_id, user_id.as_i64()), map_row)?;

    if let Some(transaction_id) = payment.transaction_id {
        delete_ledger_transaction(user_id, transaction_id, connection)?;
    }

    Ok(payment)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        account::{AccountRequest, create_account, get_account},
        auth::UserID,
        db::test_utils::{must_create_connection_and_user, must_create_test_user},
        financing::{AmortizationSystem, Financing, FinancingRequest, create_financing},
        money::Money,
        percent::Percent,
        transaction::{TransactionSource, count_transactions, get_transaction},
    };

    use super::{
        PayInstallmentRequest, delete_financing_payment, get_financing_payments, pay_installment,
    };

    fn must_create_loan(
        user_id: UserID,
        installments: u32,
        account_id: Option<i64>,
        connection: &Connection,
    ) -> Financing {
        create_financing(
            user_id,
            FinancingRequest {
                description: "Laptop".to_owned(),
                lender: None,
                principal: Money::from_cents(30_000),
                annual_interest_rate: Percent::from_str("0").unwrap(),
                installments,
                first_due_date: date!(2025 - 02 - 01),
                system: AmortizationSystem::Price,
                account_id,
                category_id: None,
            },
            connection,
        )
        .unwrap()
    }

    fn next_installment() -> PayInstallmentRequest {
        PayInstallmentRequest {
            installment_number: None,
            amount: None,
            date: date!(2025 - 02 - 01),
            account_id: None,
        }
    }

    #[test]
    fn pays_next_installment_from_financing_account() {
        let (connection, user_id) = must_create_connection_and_user();
        let account = create_account(user_id, AccountRequest::named("Checking"), &connection)
            .unwrap();
        let financing = must_create_loan(user_id, 3, Some(account.id), &connection);

        let receipt = pay_installment(user_id, financing.id, next_installment(), &connection)
            .unwrap();

        assert_eq!(receipt.payment.installment_number, 1);
        assert_eq!(receipt.payment.amount, Money::from_cents(10_000));
        assert_eq!(receipt.financing.summary.paid_installments, 1);
        let transaction_id = receipt.payment.transaction_id.unwrap();
        let transaction = get_transaction(user_id, transaction_id, &connection).unwrap();
        assert_eq!(transaction.source, TransactionSource::Financing);
        assert_eq!(transaction.description, "Laptop installment 1/3");
        assert_eq!(
            get_account(user_id, account.id, &connection).unwrap().balance,
            Money::from_cents(-10_000)
        );
    }

    #[test]
    fn pays_without_ledger_when_no_account() {
        let (connection, user_id) = must_create_connection_and_user();
        let financing = must_create_loan(user_id, 3, None, &connection);

        let receipt = pay_installment(user_id, financing.id, next_installment(), &connection)
            .unwrap();

        assert_eq!(receipt.payment.transaction_id, None);
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[test]
    fn rejects_bad_installment_numbers() {
        let (connection, user_id) = must_create_connection_and_user();
        let financing = must_create_loan(user_id, 3, None, &connection);
        let second = PayInstallmentRequest {
            installment_number: Some(2),
            ..next_installment()
        };
        pay_installment(user_id, financing.id, second.clone(), &connection).unwrap();

        assert_eq!(
            pay_installment(user_id, financing.id, second, &connection),
            Err(Error::InstallmentAlreadyPaid(2))
        );
        assert_eq!(
            pay_installment(
                user_id,
                financing.id,
                PayInstallmentRequest {
                    installment_number: Some(4),
                    ..next_installment()
                },
                &connection
            ),
            Err(Error::InvalidInstallment(4))
        );
    }

    #[test]
    fn settled_financing_rejects_payments() {
        let (connection, user_id) = must_create_connection_and_user();
        let financing = must_create_loan(user_id, 2, None, &connection);
        pay_installment(user_id, financing.id, next_installment(), &connection).unwrap();
        let receipt = pay_installment(user_id, financing.id, next_installment(), &connection)
            .unwrap();

        assert!(receipt.financing.summary.is_settled);
        assert_eq!(receipt.financing.summary.outstanding_balance, Money::ZERO);
        assert_eq!(
            pay_installment(user_id, financing.id, next_installment(), &connection),
            Err(Error::FinancingSettled)
        );
    }

    #[test]
    fn custom_amount_is_recorded() {
        let (connection, user_id) = must_create_connection_and_user();
        let financing = must_create_loan(user_id, 3, None, &connection);

        let receipt = pay_installment(
            user_id,
            financing.id,
            PayInstallmentRequest {
                amount: Some(Money::from_cents(10_500)),
                ..next_installment()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(receipt.financing.summary.total_paid, Money::from_cents(10_500));
    }

    #[test]
    fn deleting_payment_removes_ledger_transaction() {
        let (connection, user_id) = must_create_connection_and_user();
        let account = create_account(user_id, AccountRequest::named("Checking"), &connection)
            .unwrap();
        let financing = must_create_loan(user_id, 3, Some(account.id), &connection);
        let receipt = pay_installment(user_id, financing.id, next_installment(), &connection)
            .unwrap();

        delete_financing_payment(user_id, receipt.payment.id, &connection).unwrap();

        assert_eq!(count_transactions(&connection), Ok(0));
        assert!(
            get_financing_payments(user_id, financing.id, &connection)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn payments_of_other_users_are_not_found() {
        let (connection, user_id) = must_create_connection_and_user();
        let other_user = must_create_test_user("other@example.com", &connection);
        let financing = must_create_loan(user_id, 3, None, &connection);

        assert_eq!(
            get_financing_payments(other_user, financing.id, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            pay_installment(other_user, financing.id, next_installment(), &connection),
            Err(Error::NotFound)
        );

        let receipt = pay_installment(user_id, financing.id, next_installment(), &connection)
            .unwrap();
        assert_eq!(
            delete_financing_payment(other_user, receipt.payment.id, &connection),
            Err(Error::NotFound)
        );
    }
}
