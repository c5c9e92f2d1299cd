#![allow(dead_code)]
use async_trait::async_trait;
use eventlog::config::Application;
use eventlog::models::{Event, NewEvent, StoreError};
use eventlog::storage::{EventStore, MemoryEventStore};
use once_cell::sync::Lazy;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub static GLOBAL_CONFIG: Lazy<Application> =
    Lazy::new(|| Application::new(eventlog_cfg::Config::default(), None));

/// Serves the app on an ephemeral local port and returns its base URL.
pub async fn spawn_app(store: Arc<dyn EventStore>) -> String {
    spawn_app_with(&GLOBAL_CONFIG, store).await
}

pub async fn spawn_app_with(settings: &Application, store: Arc<dyn EventStore>) -> String {
    let app = eventlog::setup_app(settings, store);
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    let server = axum::Server::from_tcp(listener)
        .expect("Failed to build server")
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());
    let _ = tokio::spawn(server);
    format!("http://{addr}")
}

/// Memory store that counts how often it is reached.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryEventStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for CountingStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.hit();
        self.inner.ensure_schema().await
    }

    async fn insert(&self, event: NewEvent) -> Result<(), StoreError> {
        self.hit();
        self.inner.insert(event).await
    }

    async fn select_recent(&self, limit: i64) -> Result<Vec<Event>, StoreError> {
        self.hit();
        self.inner.select_recent(limit).await
    }
}

/// Store whose backend is unreachable.
#[derive(Debug, Default)]
pub struct BrokenStore;

#[async_trait]
impl EventStore for BrokenStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn insert(&self, _event: NewEvent) -> Result<(), StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn select_recent(&self, _limit: i64) -> Result<Vec<Event>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }
}
