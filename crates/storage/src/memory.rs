//! In-memory store for tests and fixture-driven dry runs.
//!
//! Fixture files are JSON documents of the form
//! `{ "users": [...], "orders": [...] }` using the [`User`] and [`Order`]
//! field names (the camelCase `fcmToken` / `orderNumber` aliases are accepted).
//! Fault switches let tests exercise each store failure path.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use duewatch_core::{NotificationKey, NotificationRecord, Order, User};

use crate::error::StoreError;
use crate::store::{CreateOutcome, Store};

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<String, User>,
    orders: Vec<Order>,
    records: BTreeMap<NotificationKey, NotificationRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_list_users: AtomicBool,
    fail_ledger_reads: AtomicBool,
    fail_ledger_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(users: Vec<User>, orders: Vec<Order>) -> Self {
        let inner = Inner {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            orders,
            records: BTreeMap::new(),
        };
        Self {
            inner: RwLock::new(inner),
            ..Self::default()
        }
    }

    /// Load users and orders from a JSON fixture file.
    pub fn from_fixture(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            users = fixture.users.len(),
            orders = fixture.orders.len(),
            "loaded store fixture"
        );
        Ok(Self::with_data(fixture.users, fixture.orders))
    }

    /// Snapshot of all notification records, ordered by key.
    pub async fn records(&self) -> Vec<NotificationRecord> {
        self.inner.read().await.records.values().cloned().collect()
    }

    pub fn fail_list_users(&self, fail: bool) {
        self.fail_list_users.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ledger_reads(&self, fail: bool) {
        self.fail_ledger_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ledger_writes(&self, fail: bool) {
        self.fail_ledger_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        if self.fail_list_users.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("list_users disabled".to_string()));
        }
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn list_open_orders(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .orders
            .iter()
            .filter(|o| o.user_id == user_id && !o.completed)
            .cloned()
            .collect())
    }

    async fn get_notification_record(
        &self,
        key: &NotificationKey,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        if self.fail_ledger_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("ledger reads disabled".to_string()));
        }
        Ok(self.inner.read().await.records.get(key).cloned())
    }

    async fn create_notification_record(
        &self,
        record: &NotificationRecord,
    ) -> Result<CreateOutcome, StoreError> {
        if self.fail_ledger_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("ledger writes disabled".to_string()));
        }
        let mut inner = self.inner.write().await;
        if inner.records.contains_key(&record.key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        inner.records.insert(record.key.clone(), record.clone());
        Ok(CreateOutcome::Created)
    }
}
