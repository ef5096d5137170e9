//! Solclean Service Binary
//!
//! Tariff resolution engine behind a REST API

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use prometheus::Registry;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use solclean_common::VERSION;
use solclean_service::{router, AppState};
use solclean_tarif::{InMemoryTariffStore, TarifConfig, TarifMetrics, TariffEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = TarifConfig::load()?;

    // Initialize tracing
    init_tracing(config.log_json);

    info!("Starting Solclean tariff service v{}", VERSION);
    info!("Loaded configuration: {:?}", config);

    let store = match &config.catalog_path {
        Some(path) => InMemoryTariffStore::load_json_file(path)?,
        None => {
            warn!("No catalog_path configured, starting with an empty tariff store");
            InMemoryTariffStore::new()
        }
    };
    let stats = store.stats();
    info!(
        "Tariff store ready: {} grids ({} active), {} special site tariffs ({} active)",
        stats.total_grids,
        stats.active_grids,
        stats.total_special_tariffs,
        stats.active_special_tariffs
    );

    let registry = Registry::new();
    let metrics = Arc::new(TarifMetrics::new()?);
    metrics.register(&registry)?;

    let engine =
        TariffEngine::new(Arc::new(store), config.pricing.clone()).with_metrics(metrics);
    let app = router(AppState::new(engine, registry));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("REST API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down Solclean tariff service");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // Keep serving without graceful shutdown
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
