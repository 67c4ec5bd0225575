use csv::StringRecord;
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

pub const UNIT_NUMBER: &str = "unit_number";
pub const READING_DATE: &str = "reading_date";
pub const WATER_USAGE: &str = "water_usage";
pub const ELECTRICITY_USAGE: &str = "electricity_usage";

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Per-row validation failure. Collected by the coordinator as
/// `"Row {n}: {reason}"`; never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid water usage value")]
    InvalidWaterUsage,
    #[error("Invalid electricity usage value")]
    InvalidElectricityUsage,
    #[error("Invalid reading date value")]
    InvalidReadingDate,
    #[error("{0}")]
    Unreadable(String),
}

/// Header-derived field positions, resolved once per batch.
/// Header names match case-insensitively after trimming.
#[derive(Debug, Clone)]
pub struct Columns {
    unit_number: usize,
    reading_date: usize,
    water_usage: usize,
    electricity_usage: Option<usize>,
}

impl Columns {
    /// Resolves required columns, reporting every missing header rather than
    /// failing on the first.
    pub fn resolve(headers: &StringRecord) -> Result<Self, Vec<String>> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();
        let position = |name: &str| names.iter().position(|h| h == name);

        let unit_number = position(UNIT_NUMBER);
        let reading_date = position(READING_DATE);
        let water_usage = position(WATER_USAGE);

        let mut missing = Vec::new();
        if unit_number.is_none() {
            missing.push(UNIT_NUMBER.to_string());
        }
        if reading_date.is_none() {
            missing.push(READING_DATE.to_string());
        }
        if water_usage.is_none() {
            missing.push(WATER_USAGE.to_string());
        }

        match (unit_number, reading_date, water_usage) {
            (Some(unit_number), Some(reading_date), Some(water_usage)) => Ok(Self {
                unit_number,
                reading_date,
                water_usage,
                electricity_usage: position(ELECTRICITY_USAGE),
            }),
            _ => Err(missing),
        }
    }
}

/// A validated reading, ready for unit resolution and upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub unit_number: String,
    pub reading_date: Date,
    pub water_usage: f64,
    pub electricity_usage: f64,
}

/// Validates one record against the resolved columns.
///
/// Short records read as empty fields, so a truncated row fails the
/// missing-fields check rather than erroring structurally. Water must be a
/// finite non-negative number; electricity defaults to 0 when absent or
/// empty but must be a finite number when present.
pub fn parse_row(record: &StringRecord, columns: &Columns) -> Result<ParsedRow, RowError> {
    let field = |idx: usize| record.get(idx).unwrap_or("").trim();

    let unit_number = field(columns.unit_number);
    let raw_date = field(columns.reading_date);
    let raw_water = field(columns.water_usage);

    if unit_number.is_empty() || raw_date.is_empty() || raw_water.is_empty() {
        return Err(RowError::MissingFields);
    }

    let water_usage: f64 = raw_water.parse().map_err(|_| RowError::InvalidWaterUsage)?;
    if !water_usage.is_finite() || water_usage < 0.0 {
        return Err(RowError::InvalidWaterUsage);
    }

    let electricity_usage = match columns
        .electricity_usage
        .map(field)
        .filter(|raw| !raw.is_empty())
    {
        Some(raw) => {
            let value: f64 = raw.parse().map_err(|_| RowError::InvalidElectricityUsage)?;
            if !value.is_finite() {
                return Err(RowError::InvalidElectricityUsage);
            }
            value
        }
        None => 0.0,
    };

    let reading_date =
        Date::parse(raw_date, DATE_FORMAT).map_err(|_| RowError::InvalidReadingDate)?;

    Ok(ParsedRow {
        unit_number: unit_number.to_string(),
        reading_date,
        water_usage,
        electricity_usage,
    })
}
