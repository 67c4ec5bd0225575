pub mod row;

use consumption_store::{ReadingStore, StoreError};
use serde::Serialize;

use row::{Columns, RowError};

/// At most this many row errors are returned to the caller. Failed rows past
/// the cap still count against `imported_count`.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Structural import failure. Aborts the whole batch, unlike row errors.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("File must contain header and at least one data row")]
    EmptyInput,
    #[error("malformed header row: {0}")]
    MalformedHeader(String),
    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported_count: usize,
    pub total_rows: usize,
    pub errors: Vec<String>,
}

/// Imports a delimited batch of readings.
///
/// The header row is line 1; data rows are numbered from 2 in error
/// messages. Each valid row resolves its unit by number, creating it under
/// `default_community_id` when unknown, then upserts on
/// `(unit_id, reading_date)` with last-write-wins semantics. Row failures
/// are collected and skipped; only structural problems and store failures
/// abort the batch.
pub async fn import_readings(
    store: &dyn ReadingStore,
    text: &str,
    default_community_id: i64,
) -> Result<ImportOutcome, ImportError> {
    if text.lines().filter(|line| !line.trim().is_empty()).count() < 2 {
        return Err(ImportError::EmptyInput);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| ImportError::MalformedHeader(e.to_string()))?
        .clone();
    let columns = Columns::resolve(&headers).map_err(ImportError::MissingHeaders)?;

    let mut imported_count = 0usize;
    let mut total_rows = 0usize;
    let mut errors: Vec<String> = Vec::new();

    for (idx, record) in rdr.records().enumerate() {
        let row_number = idx + 2;
        total_rows += 1;

        let parsed = match record {
            Ok(rec) => row::parse_row(&rec, &columns),
            Err(e) => Err(RowError::Unreadable(e.to_string())),
        };

        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(reason) => {
                metrics::counter!("import_rows_rejected_total").increment(1);
                errors.push(format!("Row {row_number}: {reason}"));
                continue;
            }
        };

        let unit = match store.find_unit_by_number(&parsed.unit_number).await? {
            Some(unit) => unit,
            None => {
                store
                    .create_unit(default_community_id, &parsed.unit_number)
                    .await?
            }
        };

        store
            .upsert_reading(
                unit.id,
                parsed.reading_date,
                parsed.water_usage,
                parsed.electricity_usage,
            )
            .await?;
        imported_count += 1;
    }

    metrics::counter!("import_rows_imported_total").increment(imported_count as u64);
    errors.truncate(MAX_REPORTED_ERRORS);

    Ok(ImportOutcome {
        imported_count,
        total_rows,
        errors,
    })
}
