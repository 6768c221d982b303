use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::notification::Notification;

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i64, title: &str, message: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO notifications (user_id, title, message) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create notification")
    }

    pub async fn get_unread(&self, user_id: i64) -> Result<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 AND is_read = FALSE ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch unread notifications")
    }
}
