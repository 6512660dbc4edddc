//! Notification models

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Notification addressed to one actor, or to everyone when `user_id`
/// is absent (broadcast)
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
}
