//! Per-event study orchestration.
//!
//! [`EventStudy`] ties the pieces together for one (security, event, index) triple: it asks a
//! [`PriceSource`] for the event-window and estimation-period prices, builds returns, aligns the
//! window, fits the market model and composes abnormal returns.

use crate::abnormal::{AbnormalReturnWindow, compose};
use crate::error::{Result, StudyError};
use crate::market_model::{EstimationConfig, MarketModelEstimator, MarketModelFit};
use crate::series::{PriceSeries, ReturnSeries, build_returns};
use crate::window::{DriftMode, EventWindow, align};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;

/// Source of adjusted close prices.
///
/// `Ok(None)` signals that no data exists for the symbol and range, which is distinct from a
/// failure of the source itself.
pub trait PriceSource {
    /// Error raised when the source fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Date-ascending prices for `symbol` within `[start, end]` inclusive.
    fn get_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Option<PriceSeries>, Self::Error>;
}

impl<S: PriceSource + ?Sized> PriceSource for &S {
    type Error = S::Error;

    fn get_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Option<PriceSeries>, Self::Error> {
        (**self).get_prices(symbol, start, end)
    }
}

/// In-memory price source holding one series per symbol.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    series: HashMap<String, PriceSeries>,
}

impl PriceBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the series for its symbol.
    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    /// Builder-style [`Self::insert`].
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    /// Whether a series is stored for `symbol`.
    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }
}

impl PriceSource for PriceBook {
    type Error = Infallible;

    fn get_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Option<PriceSeries>, Self::Error> {
        Ok(self
            .series
            .get(symbol)
            .map(|s| s.slice(start, end))
            .filter(|s| !s.is_empty()))
    }
}

/// Tunables for an event study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Half-width of the event window (default: 10)
    pub window_size: u32,
    /// Days between the end of the estimation period and the event (default: 50)
    pub window_distance: u32,
    /// Joint observations used to fit the market model (default: 200)
    pub estimation_period: u32,
    /// Estimation lookback in multiples of `estimation_period` (default: 2)
    pub lookback_multiplier: u32,
    /// Event-window fetch padding in multiples of `window_size` (default: 7)
    pub window_fetch_multiplier: u32,
    /// Minimum usable observations for the market model (default: 2)
    pub min_estimation_observations: usize,
    /// Drift convention (default: trading days)
    pub mode: DriftMode,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            window_distance: 50,
            estimation_period: 200,
            lookback_multiplier: 2,
            window_fetch_multiplier: 7,
            min_estimation_observations: 2,
            mode: DriftMode::TradingDay,
        }
    }
}

impl StudyConfig {
    /// Check that the configuration can produce a result.
    ///
    /// # Errors
    /// Returns [`StudyError::InvalidConfig`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.estimation_period == 0 {
            return Err(StudyError::InvalidConfig(
                "estimation_period must be positive".to_string(),
            ));
        }
        if self.lookback_multiplier == 0 {
            return Err(StudyError::InvalidConfig(
                "lookback_multiplier must be positive".to_string(),
            ));
        }
        if self.window_fetch_multiplier == 0 {
            return Err(StudyError::InvalidConfig(
                "window_fetch_multiplier must be positive".to_string(),
            ));
        }
        if self.min_estimation_observations < 2 {
            return Err(StudyError::InvalidConfig(
                "min_estimation_observations must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Estimation settings derived from this configuration.
    pub const fn estimation(&self) -> EstimationConfig {
        EstimationConfig {
            window_distance: self.window_distance,
            period_len: self.estimation_period,
            lookback_multiplier: self.lookback_multiplier,
            min_observations: self.min_estimation_observations,
        }
    }
}

/// Event study for one security, event date and benchmark index.
#[derive(Debug, Clone)]
pub struct EventStudy {
    symbol: String,
    event_date: NaiveDate,
    index_symbol: String,
    config: StudyConfig,
    window_range: (NaiveDate, NaiveDate),
    estimation_range: (NaiveDate, NaiveDate),
}

impl EventStudy {
    /// Create a new event study.
    ///
    /// # Errors
    /// Returns [`StudyError::InvalidConfig`] if the configuration is invalid or its fetch ranges
    /// around `event_date` fall outside the representable calendar.
    pub fn new(
        symbol: impl Into<String>,
        event_date: NaiveDate,
        index_symbol: impl Into<String>,
        config: StudyConfig,
    ) -> Result<Self> {
        config.validate()?;
        let window_range = padded_window(event_date, &config)?;
        let estimation_range =
            MarketModelEstimator::new(config.estimation()).estimation_range(event_date)?;
        Ok(Self {
            symbol: symbol.into(),
            event_date,
            index_symbol: index_symbol.into(),
            config,
            window_range,
            estimation_range,
        })
    }

    /// Security symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Event date.
    pub const fn event_date(&self) -> NaiveDate {
        self.event_date
    }

    /// Benchmark index symbol.
    pub fn index_symbol(&self) -> &str {
        &self.index_symbol
    }

    /// Study configuration.
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Calendar range fetched for the event window.
    ///
    /// Padded by `window_fetch_multiplier` days per drift step so a trading-day window is
    /// normally covered despite weekends and holidays.
    pub const fn window_fetch_range(&self) -> (NaiveDate, NaiveDate) {
        self.window_range
    }

    /// Calendar range fetched for the estimation period.
    pub const fn estimation_range(&self) -> (NaiveDate, NaiveDate) {
        self.estimation_range
    }

    /// Smallest range covering both the window and estimation fetches.
    pub fn required_range(&self) -> (NaiveDate, NaiveDate) {
        let (window_start, window_end) = self.window_fetch_range();
        let (estimation_start, estimation_end) = self.estimation_range();
        (
            window_start.min(estimation_start),
            window_end.max(estimation_end),
        )
    }

    fn estimator(&self) -> MarketModelEstimator {
        MarketModelEstimator::new(self.config.estimation())
    }

    /// Aligned security and index returns around the event.
    ///
    /// # Errors
    /// Any data-driven [`StudyError`], or [`StudyError::Source`] if the price source fails.
    pub fn calculate_window_return<S: PriceSource>(&self, source: &S) -> Result<EventWindow> {
        let (start, end) = self.window_fetch_range();
        let (stock, index) = self.fetch_returns(source, start, end)?;
        align(
            &stock,
            &index,
            self.event_date,
            self.config.window_size,
            self.config.mode,
        )
    }

    /// Market model fitted over the estimation period.
    ///
    /// # Errors
    /// Any data-driven [`StudyError`], or [`StudyError::Source`] if the price source fails.
    pub fn estimate_market_model<S: PriceSource>(&self, source: &S) -> Result<MarketModelFit> {
        let (start, end) = self.estimation_range();
        let (stock, index) = self.fetch_returns(source, start, end)?;
        self.estimator().estimate(&stock, &index, self.event_date)
    }

    /// Abnormal returns over the event window.
    ///
    /// # Errors
    /// Fails if either the window or the market model is unavailable.
    pub fn calculate_window_abnormal<S: PriceSource>(
        &self,
        source: &S,
    ) -> Result<AbnormalReturnWindow> {
        let window = self.calculate_window_return(source)?;
        let fit = self.estimate_market_model(source)?;
        Ok(compose(&window, &fit))
    }

    fn fetch_returns<S: PriceSource>(
        &self,
        source: &S,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(ReturnSeries, ReturnSeries)> {
        let stock = self.fetch_prices(source, &self.symbol, start, end)?;
        let index = self.fetch_prices(source, &self.index_symbol, start, end)?;
        Ok((build_returns(&stock)?, build_returns(&index)?))
    }

    fn fetch_prices<S: PriceSource>(
        &self,
        source: &S,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        source
            .get_prices(symbol, start, end)
            .map_err(|e| StudyError::Source(Box::new(e)))?
            .ok_or_else(|| StudyError::DataUnavailable {
                symbol: symbol.to_string(),
                start,
                end,
            })
    }
}

/// Event date padded by `window_fetch_multiplier` days per drift step on both sides.
fn padded_window(event_date: NaiveDate, config: &StudyConfig) -> Result<(NaiveDate, NaiveDate)> {
    let padding = Days::new(
        u64::from(config.window_size.max(1)) * u64::from(config.window_fetch_multiplier),
    );
    event_date
        .checked_sub_days(padding)
        .zip(event_date.checked_add_days(padding))
        .ok_or_else(|| {
            StudyError::InvalidConfig(format!(
                "event window of {} days around {event_date} exceeds the supported date range",
                config.window_size
            ))
        })
}
