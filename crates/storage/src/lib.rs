//! Document store access for users, open orders, and sent-notification records.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

use std::sync::Arc;

use duewatch_core::config::{StoreBackend, StoreConfig};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{CreateOutcome, Store};

/// Open the backend selected by `config.backend`.
///
/// The memory backend starts empty unless `fixture_path` is set.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>, StoreError> {
    let backend = config
        .backend()
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    let store: Arc<dyn Store> = match backend {
        StoreBackend::Postgres => {
            if !config.postgres.is_configured() {
                tracing::warn!("PG_USERNAME is not set; connecting as the default user");
            }
            Arc::new(PgStore::connect(&config.postgres).await?)
        }
        StoreBackend::Memory => match &config.fixture_path {
            Some(path) => Arc::new(MemoryStore::from_fixture(path)?),
            None => Arc::new(MemoryStore::new()),
        },
    };
    Ok(store)
}
