//! Deposits into and withdrawals from an investment.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::AccountId,
    auth::UserID,
    database_id::DatabaseId,
    investment::{Investment, InvestmentId, get_investment},
    money::Money,
    transaction::{
        Transaction, TransactionId, TransactionKind, TransactionSource, create_transaction,
        delete_ledger_transaction,
    },
    validation::optional_text,
};

pub type ContributionId = DatabaseId;

text_enum! {
    /// Whether money went into or came out of an investment.
    pub enum ContributionKind {
        Deposit => "deposit",
        Withdrawal => "withdrawal",
    }
}

impl ContributionKind {
    /// `amount` as a change to the invested amount.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            ContributionKind::Deposit => amount,
            ContributionKind::Withdrawal => -amount,
        }
    }

    /// The ledger entry for money moving to or from an account.
    fn transaction_kind(&self) -> TransactionKind {
        match self {
            ContributionKind::Deposit => TransactionKind::Expense,
            ContributionKind::Withdrawal => TransactionKind::Income,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub investment_id: InvestmentId,
    pub kind: ContributionKind,
    pub amount: Money,
    pub date: Date,
    pub account_id: Option<AccountId>,
    pub transaction_id: Option<TransactionId>,
    pub notes: Option<String>,
    /// How much the current value of the investment moved when the contribution was made.
    ///
    /// Differs from the signed amount when a withdrawal would have taken the value below zero.
    pub value_change: Money,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContributionRequest {
    pub kind: ContributionKind,
    pub amount: Money,
    pub date: Date,
    /// When set, the money is also moved out of (deposit) or into (withdrawal) this account.
    pub account_id: Option<AccountId>,
    pub notes: Option<String>,
}

/// A new contribution and the investment it changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionReceipt {
    pub contribution: Contribution,
    pub investment: Investment,
}

pub fn create_investment_contribution_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS investment_contribution (
            id INTEGER PRIMARY KEY,
            investment_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            account_id INTEGER,
            transaction_id INTEGER,
            notes TEXT,
            value_change TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(investment_id) REFERENCES investment(id) ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id)
        );

        CREATE INDEX IF NOT EXISTS idx_contribution_investment
            ON investment_contribution(investment_id);",
    )?;

    Ok(())
}

const COLUMNS: &str = "id, investment_id, kind, amount, date, account_id, transaction_id, notes, \
    value_change, created_at";

fn map_row(row: &Row) -> Result<Contribution, rusqlite::Error> {
    Ok(Contribution {
        id: row.get(0)?,
        investment_id: row.get(1)?,
        kind: row.get(2)?,
        amount: row.get(3)?,
        date: row.get(4)?,
        account_id: row.get(5)?,
        transaction_id: row.get(6)?,
        notes: row.get(7)?,
        value_change: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Move the market value of an investment by `change`, never below zero.
///
/// Returns the change that was actually applied.
fn adjust_current_value(
    investment_id: InvestmentId,
    current_value: Money,
    change: Money,
    connection: &Connection,
) -> Result<Money, Error> {
    let new_value = current_value.checked_add(change)?.clamp_to_zero();

    connection.execute(
        "UPDATE investment SET current_value = ?1 WHERE id = ?2",
        (new_value, investment_id),
    )?;

    Ok(new_value - current_value)
}

/// Record a deposit or withdrawal.
///
/// The amount is added to (or taken from) the current value of the investment as well. Callers
/// should run this inside a SQL transaction.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the investment does not exist,
/// - [Error::Validation] if the amount is not positive,
/// - [Error::WithdrawalExceedsInvested] if a withdrawal is more than the invested amount,
/// - the errors of [create_transaction] for the ledger transaction.
pub fn create_contribution(
    user_id: UserID,
    investment_id: InvestmentId,
    request: ContributionRequest,
    connection: &Connection,
) -> Result<ContributionReceipt, Error> {
    let investment = get_investment(user_id, investment_id, connection)?;
    let amount = request.amount.ensure_positive("amount")?;

    if request.kind == ContributionKind::Withdrawal && amount > investment.invested_amount {
        return Err(Error::WithdrawalExceedsInvested {
            invested: investment.invested_amount,
        });
    }

    let transaction_id = match request.account_id {
        Some(account_id) => {
            let description = match request.kind {
                ContributionKind::Deposit => format!("Deposit to {}", investment.name),
                ContributionKind::Withdrawal => format!("Withdrawal from {}", investment.name),
            };
            let transaction = create_transaction(
                user_id,
                Transaction::build(
                    account_id,
                    request.kind.transaction_kind(),
                    amount,
                    request.date,
                    &description,
                )
                .source(TransactionSource::Investment),
                connection,
            )?;
            Some(transaction.id)
        }
        None => None,
    };

    let value_change = adjust_current_value(
        investment_id,
        investment.current_value,
        request.kind.signed(amount),
        connection,
    )?;

    let contribution = connection
        .prepare(&format!(
            "INSERT INTO investment_contribution (investment_id, kind, amount, date, account_id, \
            transaction_id, notes, value_change, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING {COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                investment_id,
                request.kind,
                amount,
                request.date,
                request.account_id,
                transaction_id,
                optional_text(request.notes),
                value_change,
                OffsetDateTime::now_utc(),
            ],
            map_row,
        )?;

    Ok(ContributionReceipt {
        contribution,
        investment: get_investment(user_id, investment_id, connection)?,
    })
}

/// Get the contributions to an investment, oldest first.
pub fn get_contributions(
    user_id: UserID,
    investment_id: InvestmentId,
    connection: &Connection,
) -> Result<Vec<Contribution>, Error> {
    get_investment(user_id, investment_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM investment_contribution WHERE investment_id = ?1
            ORDER BY date ASC, id ASC"
        ))?
        .query_map([investment_id], map_row)?
        .map(|contribution| contribution.map_err(Error::from))
        .collect()
}

/// Delete a contribution, reverse its effect on the current value and delete its ledger
/// transaction.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the contribution does not exist or belongs to another user,
/// - [Error::DepositBacksWithdrawals] if deleting a deposit would leave more withdrawn than
///   deposited.
pub fn delete_contribution(
    user_id: UserID,
    contribution_id: ContributionId,
    connection: &Connection,
) -> Result<Contribution, Error> {
    let contribution = connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM investment_contribution
            WHERE id = ?1
                AND investment_id IN (SELECT id FROM investment WHERE user_id = ?2)"
        ))?
        .query_row((contribution_id, user_id.as_i64()), map_row)?;

    let investment = get_investment(user_id, contribution.investment_id, connection)?;

    if contribution.kind == ContributionKind::Deposit
        && investment.invested_amount < contribution.amount
    {
        return Err(Error::DepositBacksWithdrawals {
            invested: investment.invested_amount,
        });
    }

    connection.execute(
        "DELETE FROM investment_contribution WHERE id = ?1",
        [contribution.id],
    )?;
    adjust_current_value(
        investment.id,
        investment.current_value,
        -contribution.value_change,
        connection,
    )?;

    if let Some(transaction_id) = contribution.transaction_id {
        delete_ledger_transaction(user_id, transaction_id, connection)?;
    }

    Ok(contribution)
}
