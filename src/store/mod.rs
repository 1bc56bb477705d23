/// Notification Store Adapter
///
/// Durable read/write of notification records and the source of truth when a
/// client reconnects. Backends are substitutable behind the capability trait
/// so dispatch logic never touches a concrete database.
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewNotification, Notification};

pub mod memory;
pub mod postgres;

pub use memory::MemoryNotificationStore;
pub use postgres::PgNotificationStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new record and assign its identifier. Identifiers increase
    /// monotonically and are never reused.
    async fn create(&self, req: NewNotification) -> Result<Notification, StoreError>;

    /// Records for a user with id greater than `since_id`, ordered by id
    /// ascending. Finite and restartable: re-issue with the last seen id to
    /// resume. Never omits a successfully created record.
    async fn list_for(&self, user_id: Uuid, since_id: i64) -> Result<Vec<Notification>, StoreError>;

    /// Flip the read flag. Idempotent: an unknown or already-read identifier
    /// is success with no state change.
    async fn mark_read(&self, id: i64) -> Result<(), StoreError>;

    /// Mark every record of a user read; returns the number of rows touched.
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Derived count of unread records; never stored independently.
    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError>;
}
