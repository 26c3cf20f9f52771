//! Event window alignment.
//!
//! Aligns a security's return series with its benchmark index around an event date and
//! extracts the rows whose drift (offset from the event) lies in `[-window_size, window_size]`.
//!
//! Two drift conventions are supported:
//!
//! - **Calendar days**: drift is `date - event_date` in days. The window always has
//!   `2 * window_size + 1` rows; days without joint trading data carry no returns.
//! - **Trading days**: only days where both series have a return are kept. Drift is the row's
//!   position relative to the anchor, the first such day on or after the event date. The window
//!   is shorter than `2 * window_size + 1` rows when history near either boundary runs out.

use crate::error::{Result, StudyError};
use crate::series::ReturnSeries;
use chrono::{Duration, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Returns of the security and its index on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedObservation {
    /// Trading date present in both series
    pub date: NaiveDate,
    /// Security return
    pub stock_return: Option<f64>,
    /// Index return
    pub index_return: Option<f64>,
}

impl CombinedObservation {
    /// Whether both returns are defined.
    pub const fn is_complete(&self) -> bool {
        self.stock_return.is_some() && self.index_return.is_some()
    }
}

/// Inner-join two return series on date.
///
/// Both inputs are date-ascending, so this is a single linear merge. Rows whose returns are
/// undefined are kept; callers decide whether they count.
pub fn combine_returns(stock: &ReturnSeries, index: &ReturnSeries) -> Vec<CombinedObservation> {
    let stock = stock.points();
    let index = index.points();
    let mut combined = Vec::with_capacity(stock.len().min(index.len()));
    let (mut i, mut j) = (0, 0);

    while i < stock.len() && j < index.len() {
        match stock[i].date.cmp(&index[j].date) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                combined.push(CombinedObservation {
                    date: stock[i].date,
                    stock_return: stock[i].value,
                    index_return: index[j].value,
                });
                i += 1;
                j += 1;
            }
        }
    }

    combined
}

/// How drift around the event date is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMode {
    /// Drift counts calendar days
    #[display("calendar-day")]
    CalendarDay,
    /// Drift counts joint trading days
    #[default]
    #[display("trading-day")]
    TradingDay,
}

impl DriftMode {
    /// Mode selected by a "calendar day" flag.
    pub const fn from_calendar_flag(calendar_day: bool) -> Self {
        if calendar_day {
            Self::CalendarDay
        } else {
            Self::TradingDay
        }
    }
}

/// One row of an aligned event window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRow {
    /// Offset from the event date
    pub drift: i64,
    /// Calendar date of the row
    pub date: NaiveDate,
    /// Security return
    pub stock_return: Option<f64>,
    /// Index return
    pub index_return: Option<f64>,
}

/// Aligned returns around an event, ordered by drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventWindow {
    event_date: NaiveDate,
    window_size: u32,
    mode: DriftMode,
    rows: Vec<WindowRow>,
}

impl EventWindow {
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

    /// Rows ordered by drift.
    pub fn rows(&self) -> &[WindowRow] {
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

    /// Number of rows in a fully covered window.
    pub const fn expected_len(&self) -> usize {
        2 * self.window_size as usize + 1
    }

    /// Whether the window covers every drift in `[-window_size, window_size]`.
    pub const fn is_complete(&self) -> bool {
        self.rows.len() == self.expected_len()
    }

    /// Drift values in order.
    pub fn drifts(&self) -> Vec<i64> {
        self.rows.iter().map(|r| r.drift).collect()
    }

    /// Row at a given drift.
    pub fn get(&self, drift: i64) -> Option<&WindowRow> {
        self.rows
            .binary_search_by_key(&drift, |r| r.drift)
            .ok()
            .map(|i| &self.rows[i])
    }
}

/// Align security and index returns around `event_date`.
///
/// # Errors
/// - [`StudyError::NoObservations`] if the series share no dates.
/// - [`StudyError::NoValidAnchor`] in trading-day mode if no joint trading day falls on or after
///   the event date.
/// - [`StudyError::InvalidConfig`] in calendar-day mode if the window runs off the calendar.
pub fn align(
    stock: &ReturnSeries,
    index: &ReturnSeries,
    event_date: NaiveDate,
    window_size: u32,
    mode: DriftMode,
) -> Result<EventWindow> {
    let combined = combine_returns(stock, index);
    if combined.is_empty() {
        return Err(StudyError::NoObservations);
    }

    let calendar = daily_calendar(&combined, event_date);
    let half = i64::from(window_size);

    let rows = match mode {
        DriftMode::CalendarDay => calendar_window(&calendar, event_date, half)?,
        DriftMode::TradingDay => trading_window(&calendar, event_date, half)?,
    };

    tracing::trace!(
        %event_date,
        %mode,
        rows = rows.len(),
        expected = 2 * half + 1,
        "aligned event window"
    );

    Ok(EventWindow {
        event_date,
        window_size,
        mode,
        rows,
    })
}

/// Every calendar day between the first and last joint observation, keyed by calendar drift.
///
/// Observed rows are inserted before the synthetic filler days, so an observation always wins
/// over an empty day at the same drift.
fn daily_calendar(
    combined: &[CombinedObservation],
    event_date: NaiveDate,
) -> BTreeMap<i64, WindowRow> {
    let mut calendar = BTreeMap::new();

    for obs in combined {
        let drift = (obs.date - event_date).num_days();
        calendar.entry(drift).or_insert(WindowRow {
            drift,
            date: obs.date,
            stock_return: obs.stock_return,
            index_return: obs.index_return,
        });
    }

    if let (Some(first), Some(last)) = (combined.first(), combined.last()) {
        let mut day = first.date;
        while day <= last.date {
            let drift = (day - event_date).num_days();
            calendar.entry(drift).or_insert(WindowRow {
                drift,
                date: day,
                stock_return: None,
                index_return: None,
            });
            day += Duration::days(1);
        }
    }

    calendar
}

fn calendar_window(
    calendar: &BTreeMap<i64, WindowRow>,
    event_date: NaiveDate,
    half: i64,
) -> Result<Vec<WindowRow>> {
    (-half..=half)
        .map(|drift| match calendar.get(&drift) {
            Some(row) => Ok(*row),
            None => {
                let date = event_date
                    .checked_add_signed(Duration::days(drift))
                    .ok_or_else(|| {
                        StudyError::InvalidConfig(format!(
                            "calendar window around {event_date} exceeds the supported date range"
                        ))
                    })?;
                Ok(WindowRow {
                    drift,
                    date,
                    stock_return: None,
                    index_return: None,
                })
            }
        })
        .collect()
}

fn trading_window(
    calendar: &BTreeMap<i64, WindowRow>,
    event_date: NaiveDate,
    half: i64,
) -> Result<Vec<WindowRow>> {
    let trading: Vec<&WindowRow> = calendar
        .values()
        .filter(|r| r.stock_return.is_some() && r.index_return.is_some())
        .collect();

    // Anchor on the first joint trading day with non-negative calendar drift, not the nearest one.
    let zero_index = trading
        .iter()
        .position(|r| r.drift >= 0)
        .ok_or(StudyError::NoValidAnchor { event_date })?;

    let rows = trading
        .iter()
        .enumerate()
        .filter_map(|(position, row)| {
            let drift = position as i64 - zero_index as i64;
            (-half..=half).contains(&drift).then_some(WindowRow {
                drift,
                ..**row
            })
        })
        .collect();

    Ok(rows)
}
