//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryId, CategoryKind, CategoryRequest, DEFAULT_CATEGORY_NAME},
    validation::required_text,
};

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            UNIQUE(user_id, kind, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id, kind);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        is_default: row.get(3)?,
    })
}

fn map_unique_violation(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, Some(_))
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateCategoryName(name.to_owned())
        }
        error => error.into(),
    }
}

/// Create a category for `user_id`.
///
/// # Errors
/// Returns [Error::DuplicateCategoryName] if the user already has a category with the same name
/// and kind.
pub fn create_category(
    user_id: UserID,
    request: CategoryRequest,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = required_text(&request.name, "name")?;

    connection
        .prepare(
            "INSERT INTO category (user_id, name, kind) VALUES (?1, ?2, ?3)
            RETURNING id, name, kind, is_default",
        )?
        .query_row((user_id.as_i64(), &name, request.kind), map_row)
        .map_err(|error| map_unique_violation(error, &name))
}

/// Create the "Uncategorized" income and expense categories if they are missing.
pub fn create_default_categories(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    for kind in [CategoryKind::Income, CategoryKind::Expense] {
        connection.execute(
            "INSERT OR IGNORE INTO category (user_id, name, kind, is_default)
            VALUES (?1, ?2, ?3, 1)",
            (user_id.as_i64(), DEFAULT_CATEGORY_NAME, kind),
        )?;
    }

    Ok(())
}

/// Get the user's default category of `kind`, creating it if it has gone missing.
pub fn default_category(
    user_id: UserID,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Category, Error> {
    let query = "SELECT id, name, kind, is_default FROM category
        WHERE user_id = ?1 AND kind = ?2 AND is_default = 1";

    match connection
        .prepare(query)?
        .query_row((user_id.as_i64(), kind), map_row)
    {
        Ok(category) => Ok(category),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            tracing::warn!("default {kind} category missing for user {user_id}, recreating it");
            create_default_categories(user_id, connection)?;

            connection
                .prepare(query)?
                .query_row((user_id.as_i64(), kind), map_row)
                .map_err(Error::from)
        }
        Err(error) => Err(error.into()),
    }
}

/// Get a single category of `user_id`.
pub fn get_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, is_default FROM category WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((category_id, user_id.as_i64()), map_row)
        .map_err(Error::from)
}

/// Get the categories of `user_id` ordered by kind and name, optionally only those of `kind`.
pub fn get_categories(
    user_id: UserID,
    kind: Option<CategoryKind>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, is_default FROM category
            WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2)
            ORDER BY kind ASC, name COLLATE NOCASE ASC",
        )?
        .query_map((user_id.as_i64(), kind), map_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// Rename a category or change its kind.
///
/// Default categories keep their kind so that every user always has one default per kind.
pub fn update_category(
    user_id: UserID,
    category_id: CategoryId,
    request: CategoryRequest,
    connection: &Connection,
) -> Result<Category, Error> {
    let existing = get_category(user_id, category_id, connection)?;
    let name = required_text(&request.name, "name")?;

    if existing.is_default && existing.kind != request.kind {
        return Err(Error::DefaultCategory);
    }

    if existing.kind != request.kind {
        let is_used = connection
            .prepare(
                "SELECT 1 FROM \"transaction\" WHERE category_id = ?1
                UNION ALL SELECT 1 FROM fixed_account WHERE category_id = ?1",
            )?
            .exists([category_id])?;

        if is_used {
            return Err(Error::CategoryKindMismatch);
        }
    }

    connection
        .prepare(
            "UPDATE category SET name = ?1, kind = ?2 WHERE id = ?3 AND user_id = ?4
            RETURNING id, name, kind, is_default",
        )?
        .query_row(
            (&name, request.kind, category_id, user_id.as_i64()),
            map_row,
        )
        .map_err(|error| map_unique_violation(error, &name))
}

/// Delete a category, moving its transactions and fixed accounts to the default category of the
/// same kind.
///
/// # Errors
/// Returns [Error::DefaultCategory] if the category is one of the defaults.
pub fn delete_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    let category = get_category(user_id, category_id, connection)?;

    if category.is_default {
        return Err(Error::DefaultCategory);
    }

    let default = default_category(user_id, category.kind, connection)?;

    let moved = connection.execute(
        "UPDATE \"transaction\" SET category_id = ?1 WHERE category_id = ?2",
        (default.id, category_id),
    )?;
    connection.execute(
        "UPDATE fixed_account SET category_id = ?1 WHERE category_id = ?2",
        (default.id, category_id),
    )?;
    connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    tracing::debug!("deleted category {category_id}, moved {moved} transactions to {}", default.id);

    Ok(())
}

/// Pick the category for a transaction of `kind`.
///
/// With no `category_id` the default category of `kind` is used.
///
/// # Errors
/// Returns a:
/// - [Error::InvalidCategory] if `category_id` is not a category of the user,
/// - [Error::CategoryKindMismatch] if the category is of the other kind.
pub fn resolve_category(
    user_id: UserID,
    category_id: Option<CategoryId>,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<CategoryId, Error> {
    let category = match category_id {
        None => return Ok(default_category(user_id, kind, connection)?.id),
        Some(category_id) => match get_category(user_id, category_id, connection) {
            Err(Error::NotFound) => return Err(Error::InvalidCategory(category_id)),
            result => result?,
        },
    };

    if category.kind != kind {
        return Err(Error::CategoryKindMismatch);
    }

    Ok(category.id)
}
