pub mod error;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use consumption_store::ReadingStore;
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::analytics::{aggregate, benchmark, report};
use crate::export;
use crate::ingest::{self, ImportOutcome};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
    /// Community that receives units auto-created during import.
    pub default_community_id: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/benchmark/:community_id", get(community_benchmark))
        .route("/api/units/:unit_id/report", get(unit_report))
        .route("/api/communities", get(communities))
        .route("/api/communities/:community_id/consumption", get(community_consumption))
        .route("/api/export/csv/:community_id", get(export_csv))
        .route("/api/health", get(health))
        .with_state(state)
}

fn today() -> time::Date {
    OffsetDateTime::now_utc().date()
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    #[serde(flatten)]
    outcome: ImportOutcome,
}

async fn upload(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<UploadResponse>, ApiError> {
    metrics::counter!("upload_requests_total").increment(1);

    let outcome =
        ingest::import_readings(state.store.as_ref(), &body, state.default_community_id).await?;

    tracing::info!(
        imported = outcome.imported_count,
        total = outcome.total_rows,
        rejected = outcome.total_rows - outcome.imported_count,
        "readings batch imported"
    );

    Ok(Json(UploadResponse {
        success: true,
        outcome,
    }))
}

async fn community_benchmark(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
) -> Result<Json<benchmark::BenchmarkReport>, ApiError> {
    let report =
        benchmark::community_benchmark(state.store.as_ref(), community_id, today()).await?;
    Ok(Json(report))
}

async fn unit_report(
    State(state): State<AppState>,
    Path(unit_id): Path<i64>,
) -> Result<Json<report::UnitReport>, ApiError> {
    match report::unit_report(state.store.as_ref(), unit_id, today()).await? {
        Some(report) => Ok(Json(report)),
        None => Err(ApiError::NotFound("Unit not found".to_string())),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommunityResponse {
    id: i64,
    name: String,
    unit_count: i64,
    avg_consumption: f64,
}

async fn communities(
    State(state): State<AppState>,
) -> Result<Json<Vec<CommunityResponse>>, ApiError> {
    let since = today() - time::Duration::days(aggregate::WINDOW_DAYS);
    let rows = state.store.community_summaries(since).await?;

    Ok(Json(
        rows.into_iter()
            .map(|c| CommunityResponse {
                id: c.id,
                name: c.name,
                unit_count: c.unit_count,
                avg_consumption: aggregate::round2(c.avg_consumption.unwrap_or(0.0)),
            })
            .collect(),
    ))
}

async fn community_consumption(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
) -> Result<Json<Vec<aggregate::MonthlyUsage>>, ApiError> {
    let trend = aggregate::monthly_trend(state.store.as_ref(), community_id, today()).await?;
    Ok(Json(trend))
}

async fn export_csv(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
) -> Result<Response, ApiError> {
    match export::community_csv(state.store.as_ref(), community_id).await? {
        Some(csv) => {
            let headers = [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"community_{community_id}_consumption.csv\""),
                ),
            ];
            Ok((headers, csv).into_response())
        }
        None => Err(ApiError::NotFound(
            "No data found for this community".to_string(),
        )),
    }
}

#[derive(Serialize)]
struct HealthDatabase {
    communities: i64,
    units: i64,
    readings: i64,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    database: HealthDatabase,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let counts = state.store.counts().await?;
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "OK",
        timestamp,
        database: HealthDatabase {
            communities: counts.communities,
            units: counts.units,
            readings: counts.readings,
        },
        version: env!("CARGO_PKG_VERSION"),
    }))
}
