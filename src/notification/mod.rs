//! Reminders for receivables, payables, bills and installments that fall due.

mod core;
mod handlers;
mod refresh;

pub use core::{
    NewNotification, Notification, NotificationId, NotificationKind, NotificationQuery,
    create_notification_table, delete_notification, get_notifications, insert_notification,
    mark_all_read, mark_read,
};
pub use handlers::{
    delete_notification_endpoint, list_notifications_endpoint,
    mark_all_notifications_read_endpoint, mark_notification_read_endpoint,
    refresh_notifications_endpoint,
};
pub use refresh::{RefreshSummary, refresh_notifications};
