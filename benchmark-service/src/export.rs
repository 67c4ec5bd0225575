use consumption_store::{ReadingStore, StoreError};
use time::{format_description::BorrowedFormatItem, macros::format_description};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

const EXPORT_HEADERS: [&str; 5] = [
    "Unit Number",
    "Reading Date",
    "Water Usage (gal)",
    "Electricity Usage (kWh)",
    "Community",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode csv: {0}")]
    Encode(String),
}

/// Renders every reading of a community as CSV, one line per reading,
/// ordered by unit number then date descending. Returns `None` when the
/// community has no readings, which the API surfaces as not-found.
pub async fn community_csv(
    store: &dyn ReadingStore,
    community_id: i64,
) -> Result<Option<String>, ExportError> {
    let rows = store.export_rows(community_id).await?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(EXPORT_HEADERS)
        .map_err(|e| ExportError::Encode(e.to_string()))?;

    for row in rows {
        let reading_date = row
            .reading_date
            .format(DATE_FORMAT)
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        wtr.write_record([
            row.unit_number.as_str(),
            reading_date.as_str(),
            &row.water_usage.to_string(),
            &row.electricity_usage.to_string(),
            row.community_name.as_str(),
        ])
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    let csv = String::from_utf8(bytes).map_err(|e| ExportError::Encode(e.to_string()))?;

    Ok(Some(csv))
}
