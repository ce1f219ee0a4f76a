//! User accounts, password handling, bearer tokens and the middleware that guards the API.

mod log_in;
mod log_out;
mod middleware;
mod password;
mod profile;
mod register;
mod session;
pub(crate) mod token;
mod user;

pub use log_in::log_in;
pub use log_out::log_out;
pub use middleware::{admin_guard, auth_guard};
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{ProfileState, change_password, get_current_user, list_sessions};
pub use register::{create_user_with_defaults, register_user};
pub use session::{
    SessionId, UserSession, count_active_sessions, create_session, create_user_session_table,
    get_active_sessions, get_session, revoke_other_sessions, revoke_session,
};
pub use user::{
    Role, User, UserID, count_users, create_user, create_user_table, get_all_users,
    get_password_hash, get_user_by_id, get_user_credentials, normalize_email, update_password,
    update_role,
};
