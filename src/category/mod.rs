//! Income and expense categories for transactions.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;

pub use create::{CategoryState, create_category_endpoint};
pub use db::{
    create_category, create_category_table, create_default_categories, default_category,
    delete_category, get_categories, get_category, resolve_category, update_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{
    Category, CategoryId, CategoryKind, CategoryQuery, CategoryRequest, DEFAULT_CATEGORY_NAME,
};
pub use edit::update_category_endpoint;
pub use list::{get_category_endpoint, list_categories_endpoint};
