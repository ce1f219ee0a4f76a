//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{money::Money, transaction::TransactionSource};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of email and password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The bearer token is missing, malformed, expired or refers to a revoked session.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The authenticated user is not allowed to perform the request.
    #[error("you do not have permission to perform this action")]
    Forbidden,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The JSON web token could not be created.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The string is not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email address is already registered to another user.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// A request field failed validation.
    #[error("{0}")]
    Validation(String),

    /// The account ID does not refer to an account owned by the user.
    #[error("the account ID {0} does not refer to a valid account")]
    InvalidAccount(i64),

    /// The category ID does not refer to a category owned by the user.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(i64),

    /// The category is for income but the transaction is an expense, or vice versa.
    #[error("the category kind does not match the transaction kind")]
    CategoryKindMismatch,

    /// The counterparty ID does not refer to a supplier or customer usable for the request.
    #[error("the counterparty ID {0} does not refer to a valid supplier or customer")]
    InvalidCounterparty(i64),

    /// The investment ID does not refer to an investment owned by the user.
    #[error("the investment ID {0} does not refer to a valid investment")]
    InvalidInvestment(i64),

    /// The specified account name already exists in the database.
    #[error("the account \"{0}\" already exists")]
    DuplicateAccountName(String),

    /// The specified category name already exists for the category kind.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// Tried to delete an account that still has transactions.
    #[error("the account has transactions and cannot be deleted")]
    AccountInUse,

    /// Tried to delete a supplier or customer that still has receivables or payables.
    #[error("the counterparty has receivables or payables and cannot be deleted")]
    CounterpartyInUse,

    /// Tried to delete one of the default categories or change its kind.
    #[error("default categories cannot be deleted or change kind")]
    DefaultCategory,

    /// Tried to edit or delete a transaction that is owned by another record.
    #[error("the transaction was created by a {0} and must be changed through it")]
    ManagedTransaction(TransactionSource),

    /// A transfer used the same account as the source and destination.
    #[error("cannot transfer money to the same account")]
    SameAccountTransfer,

    /// A payment was larger than the remaining amount of a receivable or payable.
    #[error("the payment exceeds the remaining amount of {remaining}")]
    Overpayment {
        /// The amount that is still owed.
        remaining: Money,
    },

    /// The new amount of a receivable or payable is below what has already been paid.
    #[error("the amount cannot be less than the {paid} already paid")]
    AmountBelowPaid {
        /// The sum of the existing payments.
        paid: Money,
    },

    /// The financing installment has already been paid.
    #[error("installment {0} has already been paid")]
    InstallmentAlreadyPaid(u32),

    /// The installment number is outside of the financing schedule.
    #[error("installment {0} is not part of the schedule")]
    InvalidInstallment(u32),

    /// Tried to change the terms of a financing that already has installment payments.
    #[error("the financing has payments, delete them before changing its terms")]
    FinancingHasPayments,

    /// Every installment of the financing has been paid.
    #[error("the financing has been fully paid")]
    FinancingSettled,

    /// A withdrawal was larger than the amount invested.
    #[error("the withdrawal exceeds the invested amount of {invested}")]
    WithdrawalExceedsInvested {
        /// The net amount that has been invested.
        invested: Money,
    },

    /// Deleting the deposit would leave more withdrawn from an investment than deposited.
    #[error("the deposit cannot be deleted, only {invested} is invested after the withdrawals")]
    DepositBacksWithdrawals {
        /// The net amount that has been invested.
        invested: Money,
    },

    /// Tried to pay a fixed account that is no longer active.
    #[error("the fixed account is not active")]
    InactiveFixedAccount,

    /// Tried to undo a fixed account payment that has been followed by another.
    #[error("only the latest payment of a fixed account can be deleted")]
    NotLatestFixedAccountPayment,

    /// An admin tried to remove their own admin role.
    #[error("admins cannot remove their own admin role")]
    SelfDemotion,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The CSV export could not be written.
    #[error("could not write CSV: {0}")]
    CsvError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::TooWeak(_)
            | Error::InvalidEmail(_)
            | Error::Validation(_)
            | Error::InvalidAccount(_)
            | Error::InvalidCategory(_)
            | Error::CategoryKindMismatch
            | Error::InvalidCounterparty(_)
            | Error::InvalidInvestment(_)
            | Error::SameAccountTransfer
            | Error::InvalidInstallment(_)
            | Error::InvalidTimezone(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateEmail
            | Error::DuplicateAccountName(_)
            | Error::DuplicateCategoryName(_)
            | Error::AccountInUse
            | Error::CounterpartyInUse
            | Error::DefaultCategory
            | Error::ManagedTransaction(_)
            | Error::Overpayment { .. }
            | Error::AmountBelowPaid { .. }
            | Error::InstallmentAlreadyPaid(_)
            | Error::FinancingSettled
            | Error::FinancingHasPayments
            | Error::WithdrawalExceedsInvested { .. }
            | Error::DepositBacksWithdrawals { .. }
            | Error::InactiveFixedAccount
            | Error::NotLatestFixedAccountPayment
            | Error::SelfDemotion => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::HashingError(_)
            | Error::TokenCreation(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::CsvError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal errors are not intended to be shown to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
