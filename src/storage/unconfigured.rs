use super::EventStore;
use crate::config::database_url_sources;
use crate::models::{Event, NewEvent, StoreError};
use async_trait::async_trait;

/// Stand-in store used when no connection string was found at startup.
/// Every operation fails with a configuration error naming the sources tried.
#[derive(Debug, Clone)]
pub struct UnconfiguredStore {
    tried: String,
}

impl Default for UnconfiguredStore {
    fn default() -> Self {
        Self {
            tried: database_url_sources().join(", "),
        }
    }
}

impl UnconfiguredStore {
    pub fn tried(&self) -> &str {
        &self.tried
    }

    fn error(&self) -> StoreError {
        StoreError::Configuration {
            tried: self.tried.clone(),
        }
    }
}

#[async_trait]
impl EventStore for UnconfiguredStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Err(self.error())
    }

    async fn insert(&self, _event: NewEvent) -> Result<(), StoreError> {
        Err(self.error())
    }

    async fn select_recent(&self, _limit: i64) -> Result<Vec<Event>, StoreError> {
        Err(self.error())
    }
}
