/// PostgreSQL-backed notification store
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{NotificationStore, StoreError};
use crate::models::{NewNotification, Notification, NotificationCategory};

pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &sqlx::postgres::PgRow) -> Notification {
        let category: String = row.get("category");
        Notification {
            id: row.get("id"),
            recipient_id: row.get("recipient_id"),
            category: NotificationCategory::parse(&category),
            title: row.get("title"),
            body: row.get("body"),
            is_read: row.get("is_read"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, req: NewNotification) -> Result<Notification, StoreError> {
        let query = r#"
            INSERT INTO notifications (recipient_id, category, title, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, recipient_id, category, title, body, is_read, created_at
        "#;

        let row = sqlx::query(query)
            .bind(req.recipient_id)
            .bind(req.category.as_str())
            .bind(&req.title)
            .bind(&req.body)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to create notification: {}", e);
                StoreError::from(e)
            })?;

        let notification = Self::map_row(&row);
        info!(
            notification_id = notification.id,
            recipient = %notification.recipient_id,
            "created notification"
        );
        Ok(notification)
    }

    async fn list_for(
        &self,
        user_id: Uuid,
        since_id: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let query = r#"
            SELECT id, recipient_id, category, title, body, is_read, created_at
            FROM notifications
            WHERE recipient_id = $1 AND id > $2
            ORDER BY id ASC
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(since_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::map_row).collect())
    }

    async fn mark_read(&self, id: i64) -> Result<(), StoreError> {
        let query = r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1
        "#;

        let result = sqlx::query(query).bind(id).execute(&self.pool).await?;
        // Zero rows means an unknown id; stays a success for idempotence.
        debug!(
            notification_id = id,
            rows = result.rows_affected(),
            "marked notification read"
        );
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let query = r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE recipient_id = $1 AND is_read = FALSE
        "#;

        let result = sqlx::query(query).bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let query = r#"
            SELECT COUNT(*) AS count
            FROM notifications
            WHERE recipient_id = $1 AND is_read = FALSE
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }
}
