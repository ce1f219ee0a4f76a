//! Category domain types.

use serde::{Deserialize, Serialize};

use crate::{database_id::DatabaseId, transaction::TransactionKind};

pub type CategoryId = DatabaseId;

/// Categories are split the same way as transactions, into income and expense.
pub type CategoryKind = TransactionKind;

/// The name of the category each user gets for each kind, used when no category is given.
pub const DEFAULT_CATEGORY_NAME: &str = "Uncategorized";

/// A label for grouping income or expense transactions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub kind: CategoryKind,
    /// Default categories are created at registration and cannot be deleted.
    pub is_default: bool,
}

/// The request body for creating or renaming a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub kind: CategoryKind,
}

/// The query parameters for the category list.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CategoryQuery {
    pub kind: Option<CategoryKind>,
}
