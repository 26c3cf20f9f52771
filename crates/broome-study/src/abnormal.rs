//! Abnormal returns over an event window.

use crate::market_model::MarketModelFit;
use crate::window::{DriftMode, EventWindow, WindowRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event window row annotated with its abnormal return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbnormalRow {
    /// Offset from the event date
    pub drift: i64,
    /// Calendar date of the row
    pub date: NaiveDate,
    /// Security return
    pub stock_return: Option<f64>,
    /// Index return
    pub index_return: Option<f64>,
    /// `stock_return - intercept - beta * index_return`
    pub abnormal_return: Option<f64>,
}

/// Event window with abnormal returns and the market model that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbnormalReturnWindow {
    event_date: NaiveDate,
    window_size: u32,
    mode: DriftMode,
    fit: MarketModelFit,
    rows: Vec<AbnormalRow>,
}

impl AbnormalReturnWindow {
    /// Event date the window is centred on.
    pub const fn event_date(&self) -> NaiveDate {
        self.event_date
    }

    /// Requested half-width of the window.
    pub const fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Drift convention used.
    pub const fn mode(&self) -> DriftMode {
        self.mode
    }

    /// Market model used for the expected returns.
    pub const fn fit(&self) -> &MarketModelFit {
        &self.fit
    }

    /// Rows ordered by drift.
    pub fn rows(&self) -> &[AbnormalRow] {
        &self.rows
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the window has no rows.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the window covers every drift in `[-window_size, window_size]`.
    pub const fn is_complete(&self) -> bool {
        self.rows.len() == 2 * self.window_size as usize + 1
    }

    /// Rows keyed by drift.
    pub fn as_drift_map(&self) -> BTreeMap<i64, AbnormalRow> {
        self.rows.iter().map(|r| (r.drift, *r)).collect()
    }

    /// Sum of the defined abnormal returns, or `None` if there are none.
    pub fn cumulative_abnormal_return(&self) -> Option<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.abnormal_return)
            .fold(None, |acc, ar| Some(acc.unwrap_or(0.0) + ar))
    }
}

/// Apply a fitted market model to every row of an event window.
///
/// The window is neither filtered nor reordered.
pub fn compose(window: &EventWindow, fit: &MarketModelFit) -> AbnormalReturnWindow {
    let rows = window
        .rows()
        .iter()
        .map(|row: &WindowRow| AbnormalRow {
            drift: row.drift,
            date: row.date,
            stock_return: row.stock_return,
            index_return: row.index_return,
            abnormal_return: fit.abnormal_return(row.stock_return, row.index_return),
        })
        .collect();

    AbnormalReturnWindow {
        event_date: window.event_date(),
        window_size: window.window_size(),
        mode: window.mode(),
        fit: *fit,
        rows,
    }
}
