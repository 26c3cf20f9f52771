//! Price and return series.
//!
//! A [`PriceSeries`] is the date-ascending, duplicate-free sequence of adjusted closes handed
//! over by a price source. [`build_returns`] turns it into a [`ReturnSeries`] of simple
//! day-over-day returns:
//!
//! ```text
//! r[i] = (close[i] - close[i-1]) / close[i-1]
//! ```
//!
//! The first day of any series has no return, and neither has a day whose predecessor close is
//! not a usable number.

use crate::error::{Result, StudyError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single adjusted close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    /// Adjusted close price
    pub adjusted_close: f64,
}

impl PricePoint {
    /// Create a new price point.
    pub const fn new(date: NaiveDate, adjusted_close: f64) -> Self {
        Self {
            date,
            adjusted_close,
        }
    }
}

/// Date-ascending, duplicate-free price series for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from arbitrary points.
    ///
    /// Points are sorted by date; when a date appears more than once the first occurrence wins.
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// Build a series from `(date, adjusted_close)` pairs.
    pub fn from_pairs(
        symbol: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        Self::new(
            symbol,
            pairs
                .into_iter()
                .map(|(date, close)| PricePoint::new(date, close))
                .collect(),
        )
    }

    /// Symbol this series belongs to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Price points in date order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of price points.
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points.
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First date in the series.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Last date in the series.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Sub-series restricted to `[start, end]` inclusive.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        let points = if lo < hi {
            self.points[lo..hi].to_vec()
        } else {
            Vec::new()
        };
        Self {
            symbol: self.symbol.clone(),
            points,
        }
    }
}

/// A daily simple return; `value` is `None` when it cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    /// Trading date
    pub date: NaiveDate,
    /// Simple return versus the previous observation
    pub value: Option<f64>,
}

/// Return series derived from a [`PriceSeries`], one point per price point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    symbol: String,
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    /// Build a series from precomputed returns, sorted by date with the first duplicate kept.
    pub fn new(symbol: impl Into<String>, mut points: Vec<ReturnPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// Symbol this series belongs to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Return points in date order.
    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    /// Number of return points.
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points.
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Compute simple day-over-day returns.
///
/// # Errors
/// Returns [`StudyError::InsufficientData`] if `prices` is empty.
pub fn build_returns(prices: &PriceSeries) -> Result<ReturnSeries> {
    if prices.is_empty() {
        return Err(StudyError::InsufficientData {
            symbol: prices.symbol().to_string(),
        });
    }

    let mut points = Vec::with_capacity(prices.len());
    let mut previous: Option<f64> = None;

    for point in prices.points() {
        let value = previous.and_then(|prev| simple_return(prev, point.adjusted_close));
        points.push(ReturnPoint {
            date: point.date,
            value,
        });
        previous = Some(point.adjusted_close);
    }

    Ok(ReturnSeries {
        symbol: prices.symbol().to_string(),
        points,
    })
}

fn simple_return(previous: f64, current: f64) -> Option<f64> {
    if !previous.is_finite() || !current.is_finite() || previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_build_returns() {
        let prices =
            PriceSeries::from_pairs("AAPL", [(date(1), 100.0), (date(2), 101.0), (date(3), 99.0)]);
        let returns = build_returns(&prices).unwrap();

        assert_eq!(returns.len(), 3);
        assert_eq!(returns.symbol(), "AAPL");
        assert!(returns.points()[0].value.is_none());
        assert_relative_eq!(returns.points()[1].value.unwrap(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(
            returns.points()[2].value.unwrap(),
            -2.0 / 101.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_build_returns_empty() {
        let prices = PriceSeries::new("AAPL", Vec::new());
        let result = build_returns(&prices);
        assert!(matches!(result, Err(StudyError::InsufficientData { .. })));
    }

    #[test]
    fn test_unusable_predecessor() {
        let prices = PriceSeries::from_pairs(
            "X",
            [
                (date(1), 10.0),
                (date(2), f64::NAN),
                (date(3), 11.0),
                (date(4), 0.0),
                (date(5), 1.0),
            ],
        );
        let returns = build_returns(&prices).unwrap();
        let values: Vec<_> = returns.points().iter().map(|p| p.value).collect();
        assert_eq!(values[1], None);
        assert_eq!(values[2], None);
        assert_relative_eq!(values[3].unwrap(), -1.0);
        assert_eq!(values[4], None);
    }

    #[test]
    fn test_series_sorted_and_deduplicated() {
        let prices = PriceSeries::from_pairs(
            "X",
            [(date(3), 3.0), (date(1), 1.0), (date(3), 30.0), (date(2), 2.0)],
        );
        let closes: Vec<_> = prices.points().iter().map(|p| p.adjusted_close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_slice_inclusive() {
        let prices = PriceSeries::from_pairs("X", (1..=10).map(|d| (date(d), f64::from(d))));
        let slice = prices.slice(date(3), date(5));
        assert_eq!(slice.len(), 3);
        assert_eq!(slice.first_date(), Some(date(3)));
        assert_eq!(slice.last_date(), Some(date(5)));

        assert!(prices.slice(date(20), date(25)).is_empty());
        assert!(prices.slice(date(5), date(3)).is_empty());
    }
}
