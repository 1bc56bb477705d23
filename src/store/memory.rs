/// In-memory notification store
///
/// Backs tests and database-less development runs. Behaves exactly like the
/// PostgreSQL store: monotonically increasing identifiers, ascending order,
/// idempotent mark-read.
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NotificationStore, StoreError};
use crate::models::{NewNotification, Notification};

#[derive(Default)]
pub struct MemoryNotificationStore {
    records: RwLock<Vec<Notification>>,
    next_id: AtomicI64,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, req: NewNotification) -> Result<Notification, StoreError> {
        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            recipient_id: req.recipient_id,
            category: req.category,
            title: req.title,
            body: req.body,
            is_read: false,
            created_at: Utc::now(),
        };
        self.records.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn list_for(
        &self,
        user_id: Uuid,
        since_id: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<Notification> = records
            .iter()
            .filter(|n| n.recipient_id == user_id && n.id > since_id)
            .cloned()
            .collect();
        matching.sort_by_key(|n| n.id);
        Ok(matching)
    }

    async fn mark_read(&self, id: i64) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.iter_mut().find(|n| n.id == id) {
            record.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let mut touched = 0;
        for record in records
            .iter_mut()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
        {
            record.is_read = true;
            touched += 1;
        }
        Ok(touched)
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
            .count() as u64)
    }
}
