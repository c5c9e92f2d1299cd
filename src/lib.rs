pub mod axumlib;
pub mod config;
pub mod storage;

pub mod handlers {
    mod events;
    pub use events::{events_handler, CORS_HEADERS};
    mod ping;
    pub use ping::ping_handler;
}

pub mod models {
    pub mod envelope;
    pub use envelope::Envelope;

    pub mod error;
    pub use error::{ApiError, StoreError};

    pub mod event;
    pub use event::{Event, NewEvent, UNKNOWN_EVENT_TYPE};

    pub mod limit;
    pub use limit::LimitPolicy;

    pub mod route;
    pub use route::Route;
}

pub mod services {
    pub mod event_log;
    pub use event_log::EventService;
    pub mod normalize;
}

use crate::config::Application;
use crate::models::LimitPolicy;
use crate::services::normalize::NormalizeOptions;
use crate::services::EventService;
use crate::storage::EventStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get, Router};
use color_eyre::eyre::Result;
use handlers::{events_handler, ping_handler};
use opentelemetry::KeyValue;
use opentelemetry_sdk::{trace, Resource};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

pub const EVENTS_PATH: &str = "/events";

#[derive(Clone, Debug)]
pub struct AppState {
    pub events: EventService,
    pub normalize: NormalizeOptions,
}

#[allow(clippy::missing_errors_doc)]
pub fn setup_tracing(debug: bool, otlp: bool) -> Result<()> {
    // Create env filter
    let default_level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .map_or_else(|_| EnvFilter::new(default_level), |env_filter| env_filter);

    // Install a new OpenTelemetry trace pipeline when asked to
    let telemetry_layer = if otlp {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(
                trace::config().with_resource(Resource::new(vec![KeyValue::new(
                    "service.name",
                    "eventlog",
                )])),
            )
            .install_batch(opentelemetry::runtime::Tokio)?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(ErrorLayer::default())
        .with(telemetry_layer)
        .try_init()?;

    info!(otlp, "Initialized tracing and logging systems");

    Ok(())
}

#[tracing::instrument(skip(store))]
pub fn setup_app(settings: &Application, store: Arc<dyn EventStore>) -> Router {
    let base = &settings.base;
    let limits = LimitPolicy::new(base.list_default_limit, base.list_max_limit);
    debug!(?limits, "Using list limits");

    let events = EventService::new(store, limits, Duration::from_secs(base.storage_timeout_secs));
    info!("Created event service");

    let normalize = NormalizeOptions::from_config(base);
    debug!(?normalize, max_body_bytes = base.max_body_bytes, "Using request options");

    let state = AppState { events, normalize };

    Router::new()
        .fallback(axumlib::fallback)
        .route(EVENTS_PATH, any(events_handler))
        .route("/ping", get(ping_handler))
        .layer(DefaultBodyLimit::max(base.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
