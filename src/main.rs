use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use durger_king::api::start_api_server;
use durger_king::config::Config;
use durger_king::metrics::{start_metrics_server, Metrics};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG (e.g. RUST_LOG=debug)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,durger_king=debug")))
        .init();

    tracing::info!("🍔 Starting Durger King ordering backend");

    let config = Config::load()?;

    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let state = durger_king::build_state(&config, metrics.clone()).await?;

    tokio::try_join!(
        start_api_server(state, config.http_host.clone(), config.http_port),
        start_metrics_server(metrics, config.http_host.clone(), config.metrics_port),
    )?;

    tracing::info!("Servers stopped");
    Ok(())
}
