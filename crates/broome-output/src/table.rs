//! Wide result table: one row per event, one column per drift.

use crate::error::Result;
use broome_study::AbnormalReturnWindow;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Per-event stock and abnormal returns laid out as `return t{d}` and `ab return t{d}`
/// columns for `d` in `[-window_size, window_size]`.
///
/// Only complete windows contribute values. Any other event, including one without a
/// result at all, becomes a row of nulls so that rows stay aligned with the event file.
#[derive(Debug, Clone)]
pub struct ResultTable {
    window_size: u32,
    rows: Vec<Option<Vec<(Option<f64>, Option<f64>)>>>,
}

impl ResultTable {
    /// Create an empty table for windows of half-width `window_size`.
    pub const fn new(window_size: u32) -> Self {
        Self {
            window_size,
            rows: Vec::new(),
        }
    }

    /// Append the next event's outcome.
    pub fn push(&mut self, window: Option<&AbnormalReturnWindow>) {
        let row = window
            .filter(|w| w.window_size() == self.window_size && w.is_complete())
            .and_then(|w| {
                let by_drift = w.as_drift_map();
                self.drifts()
                    .map(|d| {
                        by_drift
                            .get(&d)
                            .map(|r| (r.stock_return, r.abnormal_return))
                    })
                    .collect::<Option<Vec<_>>>()
            });
        self.rows.push(row);
    }

    /// Number of events.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no events have been pushed.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of events with values.
    pub fn filled(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }

    fn drifts(&self) -> std::ops::RangeInclusive<i64> {
        let half = i64::from(self.window_size);
        -half..=half
    }

    /// Names of the stock return columns in drift order.
    pub fn return_columns(&self) -> Vec<String> {
        self.drifts().map(|d| format!("return t{d}")).collect()
    }

    /// Names of the abnormal return columns in drift order.
    pub fn abnormal_columns(&self) -> Vec<String> {
        self.drifts().map(|d| format!("ab return t{d}")).collect()
    }

    /// Build the result columns as a data frame.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let width = 2 * self.window_size as usize + 1;
        let mut columns: Vec<Column> = Vec::with_capacity(2 * width);

        for (i, name) in self.return_columns().into_iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| r.as_ref().and_then(|cells| cells[i].0))
                .collect();
            columns.push(Series::new(name.into(), values).into());
        }

        for (i, name) in self.abnormal_columns().into_iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| r.as_ref().and_then(|cells| cells[i].1))
                .collect();
            columns.push(Series::new(name.into(), values).into());
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Place the result columns to the right of the event table.
    ///
    /// Event columns that share a name with a result column, such as those left by an earlier
    /// run over the same file, are replaced by the new results.
    pub fn join_events(&self, events: &DataFrame) -> Result<DataFrame> {
        let results = self.to_frame()?;
        let mut events = events.clone();
        for name in results.get_column_names() {
            if events.get_column_index(name).is_some() {
                events.drop_in_place(name)?;
            }
        }
        Ok(events.hstack(results.get_columns())?)
    }
}

/// Write a data frame as CSV with a header row.
pub fn write_csv(frame: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(frame)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use broome_study::{DriftMode, MarketModelFit, PriceSeries, align, build_returns, compose};
    use chrono::NaiveDate;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn window(event: NaiveDate, window_size: u32, mode: DriftMode) -> AbnormalReturnWindow {
        let days: Vec<NaiveDate> = (1..=10).map(jan).collect();
        let stock = build_returns(&PriceSeries::from_pairs(
            "AAPL",
            days.iter().enumerate().map(|(i, d)| (*d, 100.0 + i as f64)),
        ))
        .unwrap();
        let index = build_returns(&PriceSeries::from_pairs(
            "^GSPC",
            days.iter().enumerate().map(|(i, d)| (*d, 50.0 + 0.5 * i as f64)),
        ))
        .unwrap();
        let aligned = align(&stock, &index, event, window_size, mode).unwrap();
        compose(
            &aligned,
            &MarketModelFit {
                intercept: 0.0,
                beta: 1.0,
                r_squared: 0.9,
                observations: 100,
            },
        )
    }

    #[test]
    fn test_column_names() {
        let table = ResultTable::new(2);
        assert_eq!(
            table.return_columns(),
            vec!["return t-2", "return t-1", "return t0", "return t1", "return t2"]
        );
        assert_eq!(table.abnormal_columns()[0], "ab return t-2");
    }

    #[test]
    fn test_complete_and_missing_rows() {
        let mut table = ResultTable::new(2);
        table.push(Some(&window(jan(5), 2, DriftMode::TradingDay)));
        table.push(None);
        // Truncated at the start of the history.
        table.push(Some(&window(jan(2), 2, DriftMode::TradingDay)));

        assert_eq!(table.len(), 3);
        assert_eq!(table.filled(), 1);

        let frame = table.to_frame().unwrap();
        assert_eq!(frame.shape(), (3, 10));

        let t0 = frame.column("return t0").unwrap().f64().unwrap();
        assert!((t0.get(0).unwrap() - 1.0 / 103.0).abs() < 1e-12);
        assert_eq!(t0.get(1), None);
        assert_eq!(t0.get(2), None);

        let ab0 = frame.column("ab return t0").unwrap().f64().unwrap();
        assert!(ab0.get(0).is_some());
        assert_eq!(ab0.null_count(), 2);
    }

    #[test]
    fn test_mismatched_window_size_is_blank() {
        let mut table = ResultTable::new(3);
        table.push(Some(&window(jan(5), 2, DriftMode::CalendarDay)));
        assert_eq!(table.filled(), 0);
    }

    #[test]
    fn test_join_events_and_write() {
        let events = df!(
            "ticker" => ["AAPL", "MSFT"],
            "date" => ["2024-01-05", "2024-01-06"]
        )
        .unwrap();

        let mut table = ResultTable::new(1);
        table.push(Some(&window(jan(5), 1, DriftMode::CalendarDay)));
        table.push(None);

        let mut joined = table.join_events(&events).unwrap();
        assert_eq!(joined.width(), 2 + 6);
        assert_eq!(joined.get_column_names()[0].as_str(), "ticker");
        assert_eq!(joined.get_column_names()[2].as_str(), "return t-1");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event_study_result.csv");
        write_csv(&mut joined, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert!(header.starts_with("ticker,date,return t-1,return t0,return t1,ab return t-1"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_join_replaces_earlier_results() {
        let events = df!(
            "ticker" => ["AAPL", "MSFT"],
            "date" => ["2024-01-05", "2024-01-06"],
            "return t0" => [Some(9.0), None],
            "ab return t1" => [Some(9.0), Some(9.0)]
        )
        .unwrap();

        let mut table = ResultTable::new(1);
        table.push(Some(&window(jan(5), 1, DriftMode::CalendarDay)));
        table.push(None);

        let joined = table.join_events(&events).unwrap();
        assert_eq!(joined.width(), 2 + 6);
        let names: Vec<&str> = joined
            .get_column_names()
            .iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "ticker",
                "date",
                "return t-1",
                "return t0",
                "return t1",
                "ab return t-1",
                "ab return t0",
                "ab return t1"
            ]
        );

        let stale = joined.column("ab return t1").unwrap().f64().unwrap();
        assert_eq!(stale.get(1), None);
        let fresh = joined.column("return t0").unwrap().f64().unwrap();
        assert!(fresh.get(0).is_some_and(|r| r != 9.0));
    }
}
