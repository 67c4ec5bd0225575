use anyhow::{bail, Context, Result};
use benchmark_service::{config::AppConfig, ingest, observability};
use consumption_store::PgReadingStore;
use sqlx::postgres::PgPoolOptions;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_readings <csv_file_path> [community_id]");
    }
    let file_path = &args[1];

    // Load configuration (can point BENCHMARK_CONFIG to a backfill-specific file).
    let cfg = AppConfig::load()?;

    let default_community_id = match args.get(2) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid community_id '{raw}'"))?,
        None => cfg.ingest.default_community_id,
    };

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store = PgReadingStore::new(pool);

    let text = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read {file_path}"))?;

    let outcome = ingest::import_readings(&store, &text, default_community_id).await?;

    tracing::info!(
        imported = outcome.imported_count,
        total = outcome.total_rows,
        rejected = outcome.total_rows - outcome.imported_count,
        "backfill finished"
    );
    for error in &outcome.errors {
        tracing::warn!(%error, "rejected row");
    }

    Ok(())
}
