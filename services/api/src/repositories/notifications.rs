//! Notification repository

use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::notification::{NewNotification, Notification};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, type, title, message, action_url, is_read, created_at";

/// Notification repository for database operations
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a notification. A `None` recipient makes it a broadcast.
    pub async fn create(&self, new: &NewNotification) -> Result<Notification> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO notifications (user_id, type, title, message, action_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(&new.kind)
        .bind(&new.title)
        .bind(&new.message)
        .bind(&new.action_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_notification(&row))
    }

    /// Find a notification by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_notification(&row)))
    }

    /// Everything addressed to one actor plus the broadcasts, newest first
    pub async fn list_for_recipient(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1 OR user_id IS NULL
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_notification).collect())
    }

    /// Mark a notification as read
    pub async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE notifications
            SET is_read = true
            WHERE id = $1
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| map_notification(&row)))
    }

    /// Delete a notification by ID
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_notification(row: &sqlx::postgres::PgRow) -> Notification {
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: row.get("type"),
        title: row.get("title"),
        message: row.get("message"),
        action_url: row.get("action_url"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}
