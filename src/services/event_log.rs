use crate::models::{Event, LimitPolicy, NewEvent, StoreError};
use crate::storage::EventStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Appends and lists events on top of an injected store.
///
/// Every call bootstraps the schema first and every storage call is bounded
/// by `timeout`.
#[derive(Clone, Debug)]
pub struct EventService {
    store: Arc<dyn EventStore>,
    limits: LimitPolicy,
    timeout: Duration,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>, limits: LimitPolicy, timeout: Duration) -> Self {
        Self {
            store,
            limits,
            timeout,
        }
    }

    /// # Errors
    ///
    /// Any `StoreError` from bootstrap or insert, or `StoreError::Timeout`.
    #[tracing::instrument(skip(self, event))]
    pub async fn append(&self, event: NewEvent) -> Result<(), StoreError> {
        self.bounded(self.store.ensure_schema()).await?;
        self.bounded(self.store.insert(event)).await?;
        info!("Appended event");
        Ok(())
    }

    /// # Errors
    ///
    /// Any `StoreError` from bootstrap or query, or `StoreError::Timeout`.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, requested: Option<&str>) -> Result<Vec<Event>, StoreError> {
        let limit = self.limits.resolve(requested);
        self.bounded(self.store.ensure_schema()).await?;
        let rows = self.bounded(self.store.select_recent(limit)).await?;
        info!(count = rows.len(), limit, "Listed events");
        Ok(rows)
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout {
                secs: self.timeout.as_secs(),
            })?
    }
}
