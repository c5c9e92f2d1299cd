use color_eyre::eyre::Result;
use eventlog::{axumlib, config, setup_app, setup_tracing, storage};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let settings = config::new_config()?;
    setup_tracing(settings.base.debug, settings.base.otlp)?;

    let store = storage::open(&settings)?;
    let app = setup_app(&settings, Arc::clone(&store));

    let addr = settings.base.address;
    info!(addr = &addr.to_string(), "Will use socket address");

    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(axumlib::shutdown_signal())
        .await?;

    store.close().await;
    if settings.base.otlp {
        opentelemetry::global::shutdown_tracer_provider();
    }
    info!("Stopped");
    Ok(())
}
