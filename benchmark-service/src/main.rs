use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use benchmark_service::{
    api::{self, AppState},
    config::AppConfig,
    metrics_server, observability,
};
use consumption_store::PgReadingStore;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr);
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let state = AppState {
        store: Arc::new(PgReadingStore::new(pool)),
        default_community_id: cfg.ingest.default_community_id,
    };
    let app = api::router(state);

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "benchmark service listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
