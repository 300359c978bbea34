//! CSV price feed reader

use crate::error::{ForecastError, Result};
use crate::types::PriceRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::Path;

pub const DATE_COLUMN: &str = "date";
pub const PRICE_COLUMN: &str = "price_usd_per_ton";

/// Read `(date, price_usd_per_ton)` rows from a CSV file
pub fn read_price_csv<P: AsRef<Path>>(path: P) -> Result<Vec<PriceRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        ForecastError::DataUnavailable(format!("cannot open {}: {}", path.display(), e))
    })?;
    read_price_records(file)
}

/// Read price rows from any CSV source. Extra columns are ignored.
pub fn read_price_records<R: Read>(reader: R) -> Result<Vec<PriceRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let (date_idx, price_idx) = match (position(DATE_COLUMN), position(PRICE_COLUMN)) {
        (Some(d), Some(p)) => (d, p),
        (d, p) => {
            let mut missing = Vec::new();
            if d.is_none() {
                missing.push(DATE_COLUMN.to_string());
            }
            if p.is_none() {
                missing.push(PRICE_COLUMN.to_string());
            }
            return Err(ForecastError::MissingColumns { missing });
        }
    };

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        // Data rows are numbered from 1
        let row_no = i + 1;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }

        let raw_date = row.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| ForecastError::InvalidDate {
            row: row_no,
            value: raw_date.to_string(),
        })?;

        let raw_price = row.get(price_idx).unwrap_or_default();
        let price: f64 = raw_price.parse().map_err(|_| ForecastError::InvalidPrice {
            row: row_no,
            value: raw_price.to_string(),
        })?;

        records.push(PriceRecord::new(date, price));
    }

    tracing::debug!(rows = records.len(), "Read price feed");
    Ok(records)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339 timestamps
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
