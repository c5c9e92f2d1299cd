use super::EventStore;
use crate::models::{Event, NewEvent, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use tokio::sync::Mutex;
use tracing::debug;

/// Keeps events in process memory with the same ordering and id rules as
/// the Postgres store. Used for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    schema_created: bool,
    schema_creations: usize,
    next_id: i64,
    rows: Vec<Event>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the table was actually created (not merely ensured).
    pub async fn schema_creations(&self) -> usize {
        self.inner.lock().await.schema_creations
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.schema_created {
            inner.schema_created = true;
            inner.schema_creations += 1;
            debug!("Created in-memory event table");
        }
        Ok(())
    }

    async fn insert(&self, event: NewEvent) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.schema_created {
            return Err(StoreError::MissingSchema {
                table: "memory".to_owned(),
            });
        }
        inner.next_id += 1;
        let id = inner.next_id;
        // Keep created_at monotonic even if the wall clock steps back.
        let now = Utc::now();
        let created_at = inner
            .rows
            .last()
            .map_or(now, |last| last.created_at.max(now));
        inner.rows.push(event.into_event(id, created_at));
        debug!(id, "Stored event in memory");
        Ok(())
    }

    async fn select_recent(&self, limit: i64) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.lock().await;
        if !inner.schema_created {
            return Err(StoreError::MissingSchema {
                table: "memory".to_owned(),
            });
        }
        let mut rows = inner.rows.clone();
        rows.sort_by_key(|event| Reverse((event.created_at, event.id)));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }
}
