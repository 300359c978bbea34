//! Price data: CSV feed and series normalization
//!
//! The feed is read fresh on every call; nothing here caches.

pub mod feed;
pub mod series;


pub use feed::{parse_date, read_price_csv, read_price_records, DATE_COLUMN, PRICE_COLUMN};
pub use series::{normalize, PriceSeries};

use crate::error::Result;
use std::path::Path;

/// Read the CSV feed at `path` and normalize it into a daily series
pub fn load_price_series<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
    let records = read_price_csv(path)?;
    normalize(&records)
}
