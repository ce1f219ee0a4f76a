//! The endpoint for registering a new user.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    audit::{AuditAction, record},
    auth::{
        PasswordHash, Role, User, ValidatedPassword, count_users, create_user, normalize_email,
    },
    category::create_default_categories,
    db::lock_connection,
    settings::create_default_settings,
};

/// The state needed for registering a user.
#[derive(Debug, Clone)]
pub struct RegisterState {
    /// The timezone new users start with.
    pub local_timezone: String,
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for registering a user.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// A route handler for registering a new user.
///
/// The first user to register becomes an admin.
pub async fn register_user(
    State(state): State<RegisterState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, Error> {
    let email = normalize_email(&request.email)?;
    let name = request.name.trim();

    if name.is_empty() {
        return Err(Error::Validation("name cannot be empty".to_owned()));
    }

    let password = ValidatedPassword::new(&request.password, &[&email, name])?;
    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    let connection = lock_connection(&state.db_connection)?;
    let user = create_user_with_defaults(
        &email,
        name,
        password_hash,
        &state.local_timezone,
        &connection,
    )?;

    tracing::info!("registered user {} with role {}", user.id, user.role);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Create a user along with their settings and default categories.
pub fn create_user_with_defaults(
    email: &str,
    name: &str,
    password_hash: PasswordHash,
    timezone: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let transaction = connection.unchecked_transaction()?;

    let role = if count_users(&transaction)? == 0 {
        Role::Admin
    } else {
        Role::User
    };

    let user = create_user(email, name, password_hash, role, &transaction)?;
    create_default_settings(user.id, timezone, &transaction)?;
    create_default_categories(user.id, &transaction)?;
    record(
        user.id,
        AuditAction::Create,
        "user",
        Some(user.id.as_i64()),
        None,
        &transaction,
    )?;

    transaction.commit()?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        auth::{PasswordHash, Role, create_user_with_defaults},
        category::get_categories,
        db::test_utils::must_create_test_connection,
        endpoints,
        settings::get_settings,
    };

    use super::{RegisterState, register_user};

    fn get_test_server() -> (TestServer, RegisterState) {
        let state = RegisterState {
            local_timezone: "Pacific/Auckland".to_owned(),
            db_connection: Arc::new(Mutex::new(must_create_test_connection())),
        };
        let app = Router::new()
            .route(endpoints::REGISTER, post(register_user))
            .with_state(state.clone());

        (TestServer::try_new(app).unwrap(), state)
    }

    #[tokio::test]
    async fn first_user_is_admin_and_second_is_not() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "email": "Alice@Example.com",
                "name": "Alice",
                "password": "averysafeandsecurepassword",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["email"], "alice@example.com");
        assert_eq!(body["role"], "admin");

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "email": "bob@example.com",
                "name": "Bob",
                "password": "anotherverysafepassword123",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<Value>()["role"], "user");
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let (server, _) = get_test_server();
        let body = json!({
            "email": "alice@example.com",
            "name": "Alice",
            "password": "averysafeandsecurepassword",
        });

        server
            .post(endpoints::REGISTER)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(endpoints::REGISTER)
            .json(&body)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn rejects_weak_password() {
        let (server, _) = get_test_server();

        server
            .post(endpoints::REGISTER)
            .json(&json!({
                "email": "alice@example.com",
                "name": "Alice",
                "password": "password",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_invalid_email() {
        let (server, _) = get_test_server();

        server
            .post(endpoints::REGISTER)
            .json(&json!({
                "email": "alice",
                "name": "Alice",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[test]
    fn seeds_settings_and_categories() {
        let connection = must_create_test_connection();

        let user = create_user_with_defaults(
            "alice@example.com",
            "Alice",
            PasswordHash::new_unchecked("hunter2"),
            "Pacific/Auckland",
            &connection,
        )
        .unwrap();

        assert_eq!(user.role, Role::Admin);
        let settings = get_settings(user.id, &connection).unwrap();
        assert_eq!(settings.timezone, "Pacific/Auckland");
        let categories = get_categories(user.id, None, &connection).unwrap();
        assert_eq!(categories.len(), 2);
        assert!(categories.iter().all(|category| category.is_default));
    }
}
