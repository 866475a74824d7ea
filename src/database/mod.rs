pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{DatabaseConfig, StorageBackend};

pub use error::StoreError;
pub use memory::{MemoryStore, Snapshot};
pub use postgres::PgStore;
pub use store::{Counter, PageSlice, Store, StoreTx};

/// Build the configured backend, applying migrations first when asked to.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::with_timeout(Duration::from_millis(
                config.transaction_timeout_ms,
            ))))
        }
        StorageBackend::Postgres => {
            let store = PgStore::connect(config).await?;
            if config.run_migrations {
                store.migrate().await?;
            }
            Ok(Arc::new(store))
        }
    }
}
