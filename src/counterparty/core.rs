//! Suppliers and customers, stored in one table and told apart by their kind.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{UserID, normalize_email},
    database_id::DatabaseId,
    db::exists,
    validation::{optional_text, required_text},
};

pub type CounterpartyId = DatabaseId;

text_enum! {
    /// Whether the user buys from or sells to the counterparty.
    pub enum CounterpartyKind {
        Supplier => "supplier",
        Customer => "customer",
    }
}

/// A business or person the user has receivables from or payables to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterparty {
    pub id: CounterpartyId,
    pub kind: CounterpartyKind,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// A tax or company registration number.
    pub document: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The request body for creating or replacing a supplier or customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CounterpartyRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub notes: Option<String>,
}

/// The query parameters for the supplier and customer lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CounterpartyQuery {
    /// Case-insensitive substring of the name, email or document.
    pub search: Option<String>,
}

/// A request with its fields trimmed and checked.
struct CleanRequest {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    document: Option<String>,
    notes: Option<String>,
}

impl CounterpartyRequest {
    fn clean(self) -> Result<CleanRequest, Error> {
        let email = match optional_text(self.email) {
            Some(email) => Some(normalize_email(&email)?),
            None => None,
        };

        Ok(CleanRequest {
            name: required_text(&self.name, "name")?,
            email,
            phone: optional_text(self.phone),
            document: optional_text(self.document),
            notes: optional_text(self.notes),
        })
    }
}

pub fn create_counterparty_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS counterparty (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            document TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_counterparty_user_kind ON counterparty(user_id, kind);",
    )?;

    Ok(())
}

const COUNTERPARTY_COLUMNS: &str = "id, kind, name, email, phone, document, notes, created_at";

fn map_row(row: &Row) -> Result<Counterparty, rusqlite::Error> {
    Ok(Counterparty {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        document: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn create_counterparty(
    user_id: UserID,
    kind: CounterpartyKind,
    request: CounterpartyRequest,
    connection: &Connection,
) -> Result<Counterparty, Error> {
    let request = request.clean()?;

    connection
        .prepare(&format!(
            "INSERT INTO counterparty (user_id, kind, name, email, phone, document, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING {COUNTERPARTY_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                kind,
                request.name,
                request.email,
                request.phone,
                request.document,
                request.notes,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )
        .map_err(Error::from)
}

/// Get a supplier or customer of `user_id`.
///
/// A counterparty of the other kind is reported as [Error::NotFound], so a customer cannot be
/// fetched through the supplier routes.
pub fn get_counterparty(
    user_id: UserID,
    kind: CounterpartyKind,
    counterparty_id: CounterpartyId,
    connection: &Connection,
) -> Result<Counterparty, Error> {
    connection
        .prepare(&format!(
            "SELECT {COUNTERPARTY_COLUMNS} FROM counterparty
            WHERE id = ?1 AND user_id = ?2 AND kind = ?3"
        ))?
        .query_row((counterparty_id, user_id.as_i64(), kind), map_row)
        .map_err(Error::from)
}

/// Get the user's suppliers or customers ordered by name.
pub fn get_counterparties(
    user_id: UserID,
    kind: CounterpartyKind,
    query: &CounterpartyQuery,
    connection: &Connection,
) -> Result<Vec<Counterparty>, Error> {
    let search = optional_text(query.search.clone());

    connection
        .prepare(&format!(
            "SELECT {COUNTERPARTY_COLUMNS} FROM counterparty
            WHERE user_id = ?1 AND kind = ?2
                AND (?3 IS NULL
                    OR instr(lower(name), lower(?3)) > 0
                    OR instr(lower(coalesce(email, '')), lower(?3)) > 0
                    OR instr(lower(coalesce(document, '')), lower(?3)) > 0)
            ORDER BY name COLLATE NOCASE ASC"
        ))?
        .query_map((user_id.as_i64(), kind, search), map_row)?
        .map(|counterparty| counterparty.map_err(Error::from))
        .collect()
}

pub fn update_counterparty(
    user_id: UserID,
    kind: CounterpartyKind,
    counterparty_id: CounterpartyId,
    request: CounterpartyRequest,
    connection: &Connection,
) -> Result<Counterparty, Error> {
    let request = request.clean()?;

    connection
        .prepare(&format!(
            "UPDATE counterparty
            SET name = ?1, email = ?2, phone = ?3, document = ?4, notes = ?5
            WHERE id = ?6 AND user_id = ?7 AND kind = ?8
            RETURNING {COUNTERPARTY_COLUMNS}"
        ))?
        .query_row(
            (
                request.name,
                request.email,
                request.phone,
                request.document,
                request.notes,
                counterparty_id,
                user_id.as_i64(),
                kind,
            ),
            map_row,
        )
        .map_err(Error::from)
}

/// Delete a supplier or customer that has no receivables or payables.
///
/// # Errors
/// Returns [Error::CounterpartyInUse] if a receivable or payable refers to it.
pub fn delete_counterparty(
    user_id: UserID,
    kind: CounterpartyKind,
    counterparty_id: CounterpartyId,
    connection: &Connection,
) -> Result<(), Error> {
    get_counterparty(user_id, kind, counterparty_id, connection)?;

    if exists(
        "SELECT 1 FROM obligation WHERE counterparty_id = ?1",
        [counterparty_id],
        connection,
    )? {
        return Err(Error::CounterpartyInUse);
    }

    connection.execute(
        "DELETE FROM counterparty WHERE id = ?1 AND user_id = ?2",
        (counterparty_id, user_id.as_i64()),
    )?;

    Ok(())
}

/// Check that `counterparty_id` is a counterparty of `user_id` with the expected `kind`.
///
/// # Errors
/// Returns [Error::InvalidCounterparty] otherwise.
pub fn ensure_counterparty(
    user_id: UserID,
    kind: CounterpartyKind,
    counterparty_id: CounterpartyId,
    connection: &Connection,
) -> Result<(), Error> {
    let found = exists(
        "SELECT 1 FROM counterparty WHERE id = ?1 AND user_id = ?2 AND kind = ?3",
        (counterparty_id, user_id.as_i64(), kind),
        connection,
    )?;

    if found {
        Ok(())
    } else {
        Err(Error::InvalidCounterparty(counterparty_id))
    }
}
