//! CSV export of the transaction list.

use axum::{
    Extension,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    transaction::{Transaction, TransactionQuery, TransactionState, get_matching_transactions},
};

const CSV_HEADER: [&str; 8] = [
    "id",
    "date",
    "kind",
    "amount",
    "account_id",
    "category_id",
    "source",
    "description",
];

/// Write `transactions` as CSV with a header row.
pub fn transactions_to_csv(transactions: &[Transaction]) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|error| Error::CsvError(error.to_string()))?;

    for transaction in transactions {
        writer
            .write_record([
                transaction.id.to_string(),
                transaction.date.to_string(),
                transaction.kind.to_string(),
                transaction.amount.to_string(),
                transaction.account_id.to_string(),
                transaction.category_id.to_string(),
                transaction.source.to_string(),
                transaction.description.clone(),
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

/// A route handler for downloading the filtered transactions as a CSV file.
pub async fn export_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionQuery>,
) -> Result<impl IntoResponse, Error> {
    let transactions = {
        let connection = lock_connection(&state.db_connection)?;
        get_matching_transactions(user_id, &query, &connection)?
    };

    let body = transactions_to_csv(&transactions)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        body,
    ))
}
