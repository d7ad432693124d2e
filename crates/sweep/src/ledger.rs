//! Record of which (order, threshold) notifications were already sent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use duewatch_core::{NotificationKey, NotificationRecord};
use duewatch_storage::{CreateOutcome, Store, StoreError};

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn has_sent(&self, key: &NotificationKey) -> Result<bool, StoreError> {
        Ok(self.store.get_notification_record(key).await?.is_some())
    }

    /// Record a delivered notification. Only call after the transport
    /// accepted the message.
    pub async fn mark_sent(
        &self,
        key: &NotificationKey,
        sent_at: DateTime<Utc>,
    ) -> Result<CreateOutcome, StoreError> {
        let record = NotificationRecord {
            key: key.clone(),
            sent_at,
        };
        let outcome = self.store.create_notification_record(&record).await?;
        if outcome == CreateOutcome::AlreadyExists {
            warn!(
                user_id = %key.user_id,
                order_id = %key.order_id,
                threshold = %key.threshold,
                "Notification record already existed; an overlapping sweep sent it too"
            );
        }
        Ok(outcome)
    }
}
