//! PostgreSQL-backed store.
//!
//! Tables are created by the embedded migrations in `migrations/`.
//! Notification records are written with `ON CONFLICT DO NOTHING`, so the
//! primary key `(user_id, order_id, threshold)` deduplicates concurrent
//! sweeps at the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use duewatch_core::config::PostgresConfig;
use duewatch_core::{NotificationKey, NotificationRecord, Order, Threshold, User};

use crate::error::StoreError;
use crate::store::{CreateOutcome, Store};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply pending migrations.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await?;
        info!("PostgreSQL connected: {}", config.host);

        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied successfully");

        Ok(Self::new(pool))
    }
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        push_token: row.try_get("push_token")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        order_code: row.try_get("order_code")?,
        completed: row.try_get("completed")?,
        memo: row.try_get("memo")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query("SELECT id, push_token FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, push_token FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_open_orders(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, order_code, completed, memo \
             FROM orders WHERE user_id = $1 AND completed = FALSE ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn get_notification_record(
        &self,
        key: &NotificationKey,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT threshold, sent_at FROM notification_records \
             WHERE user_id = $1 AND order_id = $2 AND threshold = $3",
        )
        .bind(&key.user_id)
        .bind(&key.order_id)
        .bind(key.threshold.as_key())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let threshold: String = row.try_get("threshold")?;
        let threshold: Threshold = threshold.parse().map_err(StoreError::Corrupt)?;
        let sent_at: DateTime<Utc> = row.try_get("sent_at")?;
        Ok(Some(NotificationRecord {
            key: NotificationKey::new(&key.user_id, &key.order_id, threshold),
            sent_at,
        }))
    }

    async fn create_notification_record(
        &self,
        record: &NotificationRecord,
    ) -> Result<CreateOutcome, StoreError> {
        let result = sqlx::query(
            "INSERT INTO notification_records (user_id, order_id, threshold, sent_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
        )
        .bind(&record.key.user_id)
        .bind(&record.key.order_id)
        .bind(record.key.threshold.as_key())
        .bind(record.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            CreateOutcome::Created
        } else {
            CreateOutcome::AlreadyExists
        })
    }
}
