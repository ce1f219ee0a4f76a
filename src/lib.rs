//! Cashbook is a REST API for managing personal and small business finances.
//!
//! It keeps a ledger of accounts and transactions, tracks receivables and payables owed by or to
//! customers and suppliers, amortizes financings, follows investments and their goals, and
//! schedules recurring bills. All data lives in a single SQLite database.

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

#[macro_use]
mod text_enum;

mod account;
mod admin;
mod app_state;
mod audit;
mod auth;
mod category;
mod counterparty;
mod database_id;
mod dates;
mod db;
mod endpoints;
mod error;
mod financing;
mod fixed_account;
mod health;
mod investment;
mod logging;
mod money;
mod notification;
mod obligation;
mod pagination;
mod percent;
mod report;
mod routing;
mod settings;
#[cfg(test)]
mod test_utils;
mod timezone;
mod transaction;
mod validation;

pub use app_state::AppState;
pub use auth::{PasswordHash, Role, User, UserID, ValidatedPassword, create_user_with_defaults};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::logging_middleware;
pub use pagination::PaginationConfig;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
