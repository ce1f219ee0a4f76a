//! An append-only log of the changes users make.

mod core;
mod list_endpoint;

pub use core::{
    AuditAction, AuditEntry, create_audit_log_table, get_audit_entries, record,
};
pub use list_endpoint::{AuditLogQuery, list_own_audit_log};
