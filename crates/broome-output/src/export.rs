//! Per-event result export.
//!
//! [`EventResultExport`] is the serialisable record of one event: its outcome, the market
//! model behind it and the full abnormal return window. JSON output keeps that nesting; CSV
//! output is long format with one line per event and drift.

use crate::error::Result;
use broome_study::AbnormalReturnWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Outcome of a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Abnormal returns were computed.
    Ok,
    /// The data did not support a result.
    NoResult,
    /// Processing failed.
    Failed,
}

/// One row of an exported window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRowExport {
    /// Offset from the event date.
    pub drift: i64,

    /// Calendar date of the row.
    pub date: NaiveDate,

    /// Security return.
    pub stock_return: Option<f64>,

    /// Index return.
    pub index_return: Option<f64>,

    /// Abnormal return.
    pub abnormal_return: Option<f64>,
}

/// Result of one event, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResultExport {
    /// Position of the event in the input file.
    pub index: usize,

    /// Security symbol.
    pub ticker: String,

    /// Benchmark index symbol.
    pub index_symbol: String,

    /// Event date, absent when the input row had no readable date.
    pub event_date: Option<NaiveDate>,

    /// Outcome.
    pub status: EventStatus,

    /// Why there is no result, if there is none.
    pub reason: Option<String>,

    /// Whether the window covers every drift in `[-window_size, window_size]`.
    pub complete: bool,

    /// Market model intercept.
    pub intercept: Option<f64>,

    /// Market model slope.
    pub beta: Option<f64>,

    /// Market model R².
    pub r_squared: Option<f64>,

    /// Observations used in the regression.
    pub observations: Option<usize>,

    /// Sum of the defined abnormal returns.
    pub cumulative_abnormal_return: Option<f64>,

    /// Window rows in drift order.
    pub rows: Vec<WindowRowExport>,
}

impl EventResultExport {
    /// Record a computed abnormal return window.
    pub fn from_window(
        index: usize,
        ticker: impl Into<String>,
        index_symbol: impl Into<String>,
        window: &AbnormalReturnWindow,
    ) -> Self {
        let fit = window.fit();
        Self {
            index,
            ticker: ticker.into(),
            index_symbol: index_symbol.into(),
            event_date: Some(window.event_date()),
            status: EventStatus::Ok,
            reason: None,
            complete: window.is_complete(),
            intercept: Some(fit.intercept),
            beta: Some(fit.beta),
            r_squared: Some(fit.r_squared),
            observations: Some(fit.observations),
            cumulative_abnormal_return: window.cumulative_abnormal_return(),
            rows: window
                .rows()
                .iter()
                .map(|r| WindowRowExport {
                    drift: r.drift,
                    date: r.date,
                    stock_return: r.stock_return,
                    index_return: r.index_return,
                    abnormal_return: r.abnormal_return,
                })
                .collect(),
        }
    }

    /// Record an event without a result.
    pub fn without_result(
        index: usize,
        ticker: impl Into<String>,
        index_symbol: impl Into<String>,
        event_date: Option<NaiveDate>,
        status: EventStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            index,
            ticker: ticker.into(),
            index_symbol: index_symbol.into(),
            event_date,
            status,
            reason: Some(reason.into()),
            complete: false,
            intercept: None,
            beta: None,
            r_squared: None,
            observations: None,
            cumulative_abnormal_return: None,
            rows: Vec::new(),
        }
    }

    fn write_flat_records<W: Write>(&self, wtr: &mut csv::Writer<W>) -> Result<()> {
        let base = EventRowFlat {
            index: self.index,
            ticker: &self.ticker,
            index_symbol: &self.index_symbol,
            event_date: self.event_date,
            status: self.status,
            reason: self.reason.as_deref(),
            beta: self.beta,
            r_squared: self.r_squared,
            drift: None,
            date: None,
            stock_return: None,
            index_return: None,
            abnormal_return: None,
        };

        if self.rows.is_empty() {
            wtr.serialize(&base)?;
            return Ok(());
        }

        for row in &self.rows {
            wtr.serialize(EventRowFlat {
                drift: Some(row.drift),
                date: Some(row.date),
                stock_return: row.stock_return,
                index_return: row.index_return,
                abnormal_return: row.abnormal_return,
                ..base
            })?;
        }
        Ok(())
    }
}

/// Long-format CSV line: one per event and drift.
#[derive(Debug, Clone, Copy, Serialize)]
struct EventRowFlat<'a> {
    index: usize,
    ticker: &'a str,
    index_symbol: &'a str,
    event_date: Option<NaiveDate>,
    status: EventStatus,
    reason: Option<&'a str>,
    beta: Option<f64>,
    r_squared: Option<f64>,
    drift: Option<i64>,
    date: Option<NaiveDate>,
    stock_return: Option<f64>,
    index_return: Option<f64>,
    abnormal_return: Option<f64>,
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

impl Exporter for EventResultExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                self.write_flat_records(&mut wtr)?;
                finish_csv(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<EventResultExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for event in self {
                    event.write_flat_records(&mut wtr)?;
                }
                finish_csv(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
