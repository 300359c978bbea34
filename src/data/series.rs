//! Gap-free daily price series and the normalizer that builds it

use crate::error::{ForecastError, Result};
use crate::types::PriceRecord;
use chrono::{Days, NaiveDate};

/// Strictly daily price series: one positive price per calendar day, no gaps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    start: Option<NaiveDate>,
    values: Vec<f64>,
}

impl PriceSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from consecutive daily values starting at `start`
    pub fn from_daily(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        for (row, &value) in values.iter().enumerate() {
            validate_price(row + 1, value)?;
        }
        if values.is_empty() {
            return Ok(Self::empty());
        }
        Ok(Self {
            start: Some(start),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.date_at(self.values.len().checked_sub(1)?)
    }

    /// Price observed on `date`
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.offset_of(date)?;
        if idx < 0 {
            return None;
        }
        self.values.get(idx as usize).copied()
    }

    /// Date of the value stored at `idx`
    pub fn date_at(&self, idx: usize) -> Option<NaiveDate> {
        if idx >= self.values.len() {
            return None;
        }
        self.start?.checked_add_days(Days::new(idx as u64))
    }

    /// Day offset of `date` from the series start; negative before it
    pub fn offset_of(&self, date: NaiveDate) -> Option<i64> {
        Some((date - self.start?).num_days())
    }

    /// Number of observations dated strictly before `date`
    pub fn days_before(&self, date: NaiveDate) -> usize {
        match self.offset_of(date) {
            Some(offset) if offset > 0 => (offset as usize).min(self.values.len()),
            _ => 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| self.date_at(i).map(|d| (d, v)))
    }
}

/// `row` counts from 1, matching the CSV reader
fn validate_price(row: usize, price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ForecastError::InvalidPrice {
            row,
            value: price.to_string(),
        });
    }
    Ok(())
}

/// Turn unordered raw observations into a gap-free daily series.
///
/// Records are sorted by date; when a date repeats, the record appearing last
/// in the input wins. Every calendar day between the first and last date is
/// present in the output, and a day without an observation carries the most
/// recent earlier price forward.
pub fn normalize(records: &[PriceRecord]) -> Result<PriceSeries> {
    for (row, record) in records.iter().enumerate() {
        validate_price(row + 1, record.price)?;
    }

    let mut sorted: Vec<PriceRecord> = records.to_vec();
    // Stable sort keeps input order among equal dates
    sorted.sort_by_key(|r| r.date);

    let mut deduped: Vec<PriceRecord> = Vec::with_capacity(sorted.len());
    for record in sorted {
        match deduped.last_mut() {
            Some(last) if last.date == record.date => *last = record,
            _ => deduped.push(record),
        }
    }

    let (first, last) = match (deduped.first(), deduped.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Err(ForecastError::InsufficientHistory { required: 1, available: 0 }),
    };

    let span = (last - first).num_days() as usize + 1;
    let mut values = Vec::with_capacity(span);
    let mut observed = deduped.iter().peekable();
    let mut carried = deduped[0].price;

    for day in 0..span as u64 {
        let date = first + Days::new(day);
        if let Some(record) = observed.next_if(|r| r.date == date) {
            carried = record.price;
        }
        values.push(carried);
    }

    let filled = span - deduped.len();
    if filled > 0 {
        tracing::debug!(filled, first = %first, last = %last, "Forward-filled missing days");
    }

    Ok(PriceSeries {
        start: Some(first),
        values,
    })
}
