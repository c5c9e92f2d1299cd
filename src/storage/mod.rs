use crate::config::Application;
use crate::models::{Event, NewEvent, StoreError};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod memory;
pub mod postgres;
pub mod unconfigured;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;
pub use unconfigured::UnconfiguredStore;

/// Persistence for events.
///
/// Implementations must make `ensure_schema` idempotent and safe to run
/// from several processes at once, and must assign `id` and `created_at`
/// on insert.
#[async_trait]
pub trait EventStore: Send + Sync + Debug {
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn insert(&self, event: NewEvent) -> Result<(), StoreError>;

    /// Most recent first, by `created_at` then `id`.
    async fn select_recent(&self, limit: i64) -> Result<Vec<Event>, StoreError>;

    async fn close(&self) {}
}

/// Checks that `name` can be spliced into SQL as a bare identifier.
pub fn validate_table_name(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid = name.len() <= 63
        && chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidTableName {
            got: name.to_owned(),
        })
    }
}

/// Builds the store the process will hand to the router.
///
/// A missing connection string is not fatal here: the returned store fails
/// every operation with a configuration error, so the first request reports it.
///
/// # Errors
///
/// `StoreError::InvalidTableName` or an unparsable connection string.
#[tracing::instrument(skip(settings))]
pub fn open(settings: &Application) -> Result<Arc<dyn EventStore>, StoreError> {
    let base = &settings.base;
    let table = validate_table_name(&base.table)?;
    match &settings.database_url {
        Some(url) => {
            let store = PgEventStore::connect_lazy(
                url,
                table,
                Duration::from_secs(base.storage_timeout_secs),
                base.require_tls,
            )?;
            info!(table, "Created Postgres event store");
            Ok(Arc::new(store))
        }
        None => {
            let store = UnconfiguredStore::default();
            warn!(tried = %store.tried(), "No database connection string configured");
            Ok(Arc::new(store))
        }
    }
}
