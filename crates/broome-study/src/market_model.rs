//! Market model estimation.
//!
//! Fits the single-factor market model
//!
//! ```text
//! R_stock = α + β * R_index + ε
//! ```
//!
//! by ordinary least squares over a clean estimation period that ends `window_distance` days
//! before the event. The period is fetched with a lookback of `lookback_multiplier * period_len`
//! calendar days so that, after weekends and holidays drop out, up to `period_len` joint
//! observations are normally available. Only the most recent `period_len` of them are used.

use crate::error::{Result, StudyError};
use crate::series::ReturnSeries;
use crate::window::{CombinedObservation, combine_returns};
use chrono::{Days, NaiveDate};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Configuration for the market model estimation period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// Calendar days between the end of the estimation period and the event (default: 50)
    pub window_distance: u32,
    /// Number of joint observations used for the fit (default: 200)
    pub period_len: u32,
    /// Calendar lookback as a multiple of `period_len` (default: 2)
    pub lookback_multiplier: u32,
    /// Minimum number of usable observations (default: 2)
    pub min_observations: usize,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            window_distance: 50,
            period_len: 200,
            lookback_multiplier: 2,
            min_observations: 2,
        }
    }
}

/// Fitted market model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketModelFit {
    /// Regression intercept (α)
    pub intercept: f64,
    /// Slope on the index return (β)
    pub beta: f64,
    /// Coefficient of determination.
    ///
    /// Reported as 1.0 when the stock return is constant over the estimation period (zero total
    /// sum of squares). Such a fit has zero slope and explains the series trivially; it is not
    /// evidence of a strong market relationship.
    pub r_squared: f64,
    /// Number of observations used in the fit
    pub observations: usize,
}

impl MarketModelFit {
    /// Return predicted by the model for a given index return.
    pub fn expected_return(&self, index_return: f64) -> f64 {
        self.intercept + self.beta * index_return
    }

    /// Actual minus predicted return; `None` if either input is missing.
    pub fn abnormal_return(
        &self,
        stock_return: Option<f64>,
        index_return: Option<f64>,
    ) -> Option<f64> {
        match (stock_return, index_return) {
            (Some(stock), Some(index)) => Some(stock - self.intercept - self.beta * index),
            _ => None,
        }
    }
}

/// Market model estimator
#[derive(Debug, Default)]
pub struct MarketModelEstimator {
    config: EstimationConfig,
}

impl MarketModelEstimator {
    /// Create a new estimator
    pub const fn new(config: EstimationConfig) -> Self {
        Self { config }
    }

    /// Estimator configuration
    pub const fn config(&self) -> &EstimationConfig {
        &self.config
    }

    /// Calendar range `[start, end]` covered by the estimation period for an event.
    ///
    /// # Errors
    /// [`StudyError::InvalidConfig`] if the range reaches past the earliest representable date.
    pub fn estimation_range(&self, event_date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let lookback =
            u64::from(self.config.period_len) * u64::from(self.config.lookback_multiplier);
        event_date
            .checked_sub_days(Days::new(u64::from(self.config.window_distance)))
            .and_then(|end| Some((end.checked_sub_days(Days::new(lookback))?, end)))
            .ok_or_else(|| {
                StudyError::InvalidConfig(format!(
                    "estimation period for {event_date} starts before the earliest supported date"
                ))
            })
    }

    /// Estimate the market model for an event.
    ///
    /// The return series may extend beyond the estimation period; only joint observations inside
    /// [`Self::estimation_range`] are considered.
    ///
    /// # Errors
    /// - [`StudyError::EstimationUnavailable`] if fewer than `min_observations` usable rows remain.
    /// - [`StudyError::DegenerateRegression`] if the index return does not vary.
    pub fn estimate(
        &self,
        stock: &ReturnSeries,
        index: &ReturnSeries,
        event_date: NaiveDate,
    ) -> Result<MarketModelFit> {
        let (start, end) = self.estimation_range(event_date)?;

        let in_range: Vec<CombinedObservation> = combine_returns(stock, index)
            .into_iter()
            .filter(|obs| obs.date >= start && obs.date <= end)
            .collect();

        let period_len = self.config.period_len as usize;
        let skip = in_range.len().saturating_sub(period_len);

        tracing::debug!(
            symbol = stock.symbol(),
            %start,
            %end,
            joined = in_range.len(),
            used = in_range.len() - skip,
            "selected estimation period"
        );

        self.fit(&in_range[skip..])
    }

    /// Fit OLS of stock return on index return; rows with a missing return are dropped.
    ///
    /// # Errors
    /// See [`Self::estimate`].
    pub fn fit(&self, observations: &[CombinedObservation]) -> Result<MarketModelFit> {
        let (x, y): (Vec<f64>, Vec<f64>) = observations
            .iter()
            .filter_map(|obs| Some((obs.index_return?, obs.stock_return?)))
            .unzip();

        let required = self.config.min_observations.max(2);
        if x.len() < required {
            return Err(StudyError::EstimationUnavailable {
                required,
                actual: x.len(),
            });
        }

        ordinary_least_squares(&Array1::from(x), &Array1::from(y))
    }
}

fn ordinary_least_squares(x: &Array1<f64>, y: &Array1<f64>) -> Result<MarketModelFit> {
    let n = x.len();
    let x_mean = x.mean().unwrap_or(0.0);
    let y_mean = y.mean().unwrap_or(0.0);

    let x_dev = x - x_mean;
    let y_dev = y - y_mean;

    let sxx = x_dev.dot(&x_dev);
    if sxx <= f64::EPSILON * f64::EPSILON * n as f64 {
        return Err(StudyError::DegenerateRegression);
    }

    let beta = x_dev.dot(&y_dev) / sxx;
    let intercept = y_mean - beta * x_mean;

    let residuals = y - &(x * beta + intercept);
    let ssr = residuals.dot(&residuals);
    let sst = y_dev.dot(&y_dev);

    // A constant stock return is explained exactly by a zero slope.
    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 1.0 };

    Ok(MarketModelFit {
        intercept,
        beta,
        r_squared,
        observations: n,
    })
}
