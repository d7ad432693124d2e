//! The read/write surface the sweep needs from the document store.

use async_trait::async_trait;

use duewatch_core::{NotificationKey, NotificationRecord, Order, User};

use crate::error::StoreError;

/// Result of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record with the same key already existed; nothing was written.
    AlreadyExists,
}

/// Store backend. Users and orders are read-only; notification records
/// are additive only.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Orders of `user_id` whose completion flag is false.
    async fn list_open_orders(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;

    async fn get_notification_record(
        &self,
        key: &NotificationKey,
    ) -> Result<Option<NotificationRecord>, StoreError>;

    /// Create the record unless one with the same key exists.
    async fn create_notification_record(
        &self,
        record: &NotificationRecord,
    ) -> Result<CreateOutcome, StoreError>;
}
