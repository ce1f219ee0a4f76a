//! Filtering and paging of the transaction list.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    account::AccountId,
    auth::UserID,
    category::CategoryId,
    pagination::{PageRequest, Paginated},
    transaction::{Transaction, TransactionKind, core::TRANSACTION_COLUMNS, map_transaction_row},
};

/// The query parameters accepted by the transaction list and export endpoints.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransactionQuery {
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub kind: Option<TransactionKind>,
    /// Inclusive start date.
    pub from: Option<Date>,
    /// Inclusive end date.
    pub to: Option<Date>,
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl TransactionQuery {
    /// Build the WHERE clause and its parameters for the filters that are set.
    fn where_clause(&self, user_id: UserID) -> (String, Vec<Value>) {
        let mut conditions = vec!["user_id = ?".to_owned()];
        let mut params = vec![Value::Integer(user_id.as_i64())];

        if let Some(account_id) = self.account_id {
            conditions.push("account_id = ?".to_owned());
            params.push(Value::Integer(account_id));
        }

        if let Some(category_id) = self.category_id {
            conditions.push("category_id = ?".to_owned());
            params.push(Value::Integer(category_id));
        }

        if let Some(kind) = self.kind {
            conditions.push("kind = ?".to_owned());
            params.push(Value::Text(kind.as_str().to_owned()));
        }

        if let Some(from) = self.from {
            conditions.push("date >= ?".to_owned());
            params.push(Value::Text(from.to_string()));
        }

        if let Some(to) = self.to {
            conditions.push("date <= ?".to_owned());
            params.push(Value::Text(to.to_string()));
        }

        if let Some(search) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
        {
            conditions.push("instr(lower(description), lower(?)) > 0".to_owned());
            params.push(Value::Text(search.to_owned()));
        }

        (conditions.join(" AND "), params)
    }
}

/// Get one page of the user's transactions matching `query`.
///
/// Transactions are sorted by date, newest first, and then by ID to keep the order stable.
pub fn get_transactions_page(
    user_id: UserID,
    query: &TransactionQuery,
    page: PageRequest,
    connection: &Connection,
) -> Result<Paginated<Transaction>, Error> {
    let (where_clause, mut params) = query.where_clause(user_id);

    let total_items: u64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM \"transaction\" WHERE {where_clause}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    params.push(Value::Integer(page.per_page as i64));
    params.push(Value::Integer(page.offset() as i64));

    let items = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE {where_clause}
            ORDER BY date DESC, id DESC LIMIT ? OFFSET ?"
        ))?
        .query_map(params_from_iter(params.iter()), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Paginated::new(items, page, total_items))
}

/// Get every transaction of the user matching `query`, ignoring the paging parameters.
pub fn get_matching_transactions(
    user_id: UserID,
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (where_clause, params) = query.where_clause(user_id);

    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE {where_clause}
            ORDER BY date DESC, id DESC"
        ))?
        .query_map(params_from_iter(params.iter()), map_transaction_row)?
        .map(|transaction| transaction.map_err(Error::from))
        .collect()
}
