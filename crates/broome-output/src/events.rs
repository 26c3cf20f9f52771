//! Event file input.
//!
//! An event file is a CSV table with at least a `ticker` and a `date` column. Every column is
//! read as text so that the table can be written back unchanged next to the results. Dates may
//! carry a time part (`2020-01-15 00:00:00` or `2020-01-15T00:00:00`), which is ignored.
//!
//! A row with a blank ticker or an unreadable date is kept with a [`RecordError`] so that the
//! output stays aligned with the input; only a missing column rejects the whole file.

use crate::error::{OutputError, RecordError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

/// Column holding the security symbol.
pub const TICKER_COLUMN: &str = "ticker";

/// Column holding the event date.
pub const DATE_COLUMN: &str = "date";

/// One row of the event file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Security symbol, empty when the cell is blank
    pub ticker: String,
    /// Event date, or why the row cannot be studied
    pub date: std::result::Result<NaiveDate, RecordError>,
}

impl EventRecord {
    /// Whether the row can be studied.
    pub const fn is_valid(&self) -> bool {
        self.date.is_ok()
    }
}

/// Events together with the table they were read from.
#[derive(Debug, Clone)]
pub struct EventFile {
    frame: DataFrame,
    records: Vec<EventRecord>,
}

impl EventFile {
    /// Read events from a CSV file.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let frame = LazyCsvReader::new(path.as_ref())
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;
        Self::from_frame(frame)
    }

    /// Extract events from an already loaded table.
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        let tickers = string_column(&frame, TICKER_COLUMN)?;
        let dates = string_column(&frame, DATE_COLUMN)?;

        let records = tickers
            .str()?
            .into_iter()
            .zip(dates.str()?)
            .enumerate()
            .map(|(row, (ticker, date))| {
                let ticker = ticker.map(str::trim).unwrap_or_default();
                let date = if ticker.is_empty() {
                    Err(RecordError::MissingValue {
                        column: TICKER_COLUMN.to_string(),
                        row,
                    })
                } else {
                    date.ok_or_else(|| RecordError::MissingValue {
                        column: DATE_COLUMN.to_string(),
                        row,
                    })
                    .and_then(|value| parse_event_date(value, row))
                };
                EventRecord {
                    ticker: ticker.to_string(),
                    date,
                }
            })
            .collect();

        Ok(Self { frame, records })
    }

    /// The table as read, all columns kept.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Rows in file order, including rejected ones.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of rows that cannot be studied.
    pub fn rejected(&self) -> usize {
        self.records.iter().filter(|r| !r.is_valid()).count()
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the file has no events.
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn string_column(frame: &DataFrame, name: &str) -> Result<Column> {
    let column = frame
        .column(name)
        .map_err(|_| OutputError::MissingColumn(name.to_string()))?;
    Ok(column.cast(&DataType::String)?)
}

fn parse_event_date(value: &str, row: usize) -> std::result::Result<NaiveDate, RecordError> {
    let day = value
        .trim()
        .split([' ', 'T'])
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| RecordError::InvalidDate {
        row,
        value: value.to_string(),
    })
}
