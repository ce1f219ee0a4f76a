//! The notification endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::UserID,
    db::lock_connection,
    notification::{
        Notification, NotificationId, NotificationQuery, RefreshSummary, delete_notification,
        get_notifications, mark_all_read, mark_read, refresh_notifications,
    },
    settings::user_today,
};

/// The state needed by the notification endpoints.
#[derive(Debug, Clone)]
pub struct NotificationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for NotificationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn list_notifications_endpoint(
    State(state): State<NotificationState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_notifications(user_id, query.unread, &connection).map(Json)
}

pub async fn mark_notification_read_endpoint(
    State(state): State<NotificationState>,
    Extension(user_id): Extension<UserID>,
    Path(notification_id): Path<NotificationId>,
) -> Result<Json<Notification>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    mark_read(user_id, notification_id, &connection).map(Json)
}

pub async fn mark_all_notifications_read_endpoint(
    State(state): State<NotificationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let updated = mark_all_read(user_id, &connection)?;

    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete_notification_endpoint(
    State(state): State<NotificationState>,
    Extension(user_id): Extension<UserID>,
    Path(notification_id): Path<NotificationId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_notification(user_id, notification_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for generating notifications for the items that are due soon.
pub async fn refresh_notifications_endpoint(
    State(state): State<NotificationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<RefreshSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let today = user_today(user_id, &connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let summary = refresh_notifications(user_id, today, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::StatusCode,
        routing::{delete, get, post, put},
    };
    use axum_test::TestServer;
    use serde_json::Value;
    use time::{Duration, OffsetDateTime};

    use crate::{
        db::test_utils::must_create_connection_and_user,
        endpoints::{self, format_endpoint},
        money::Money,
        notification::{
            delete_notification_endpoint, list_notifications_endpoint,
            mark_all_notifications_read_endpoint, mark_notification_read_endpoint,
            refresh_notifications_endpoint,
        },
        obligation::{Direction, ObligationRequest, create_obligation},
        test_utils::{state_with_connection, with_user},
    };

    fn must_create_server() -> TestServer {
        let (connection, user_id) = must_create_connection_and_user();
        let today = OffsetDateTime::now_utc().date();
        for description in ["Water", "Gas"] {
            create_obligation(
                user_id,
                Direction::Payable,
                ObligationRequest {
                    counterparty_id: None,
                    category_id: None,
                    description: description.to_owned(),
                    amount: Money::from_cents(5_000),
                    issue_date: Some(today - Duration::days(10)),
                    due_date: today + Duration::days(1),
                    notes: None,
                },
                today,
                &connection,
            )
            .unwrap();
        }

        let app = Router::new()
            .route(endpoints::NOTIFICATIONS, get(list_notifications_endpoint))
            .route(
                endpoints::NOTIFICATIONS_REFRESH,
                post(refresh_notifications_endpoint),
            )
            .route(
                endpoints::NOTIFICATIONS_READ_ALL,
                put(mark_all_notifications_read_endpoint),
            )
            .route(endpoints::NOTIFICATION, delete(delete_notification_endpoint))
            .route(
                endpoints::NOTIFICATION_READ,
                put(mark_notification_read_endpoint),
            )
            .layer(with_user(user_id))
            .with_state(state_with_connection(connection));

        TestServer::try_new(app).unwrap()
    }

    #[tokio::test]
    async fn refresh_then_read() {
        let server = must_create_server();

        let summary = server
            .post(endpoints::NOTIFICATIONS_REFRESH)
            .await
            .json::<Value>();
        assert_eq!(summary["created"], 2);

        let unread = server
            .get(endpoints::NOTIFICATIONS)
            .add_query_param("unread", true)
            .await
            .json::<Vec<Value>>();
        assert_eq!(unread.len(), 2);
        assert_eq!(unread[0]["kind"], "payable_due");

        let id = unread[0]["id"].as_i64().unwrap();
        let read = server
            .put(&format_endpoint(endpoints::NOTIFICATION_READ, id))
            .await
            .json::<Value>();
        assert_eq!(read["read"], true);

        let all = server
            .put(endpoints::NOTIFICATIONS_READ_ALL)
            .await
            .json::<Value>();
        assert_eq!(all["updated"], 1);
    }

    #[tokio::test]
    async fn delete_notification() {
        let server = must_create_server();
        server.post(endpoints::NOTIFICATIONS_REFRESH).await;
        let notifications = server
            .get(endpoints::NOTIFICATIONS)
            .await
            .json::<Vec<Value>>();
        let path = format_endpoint(
            endpoints::NOTIFICATION,
            notifications[0]["id"].as_i64().unwrap(),
        );

        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server.delete(&path).await.assert_status_not_found();
    }
}
