//! Adjusted-close fetching from Yahoo Finance.

use crate::error::{DataError, Result};
use broome_study::{PricePoint, PriceSeries};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider with default rate limiting (1 req/sec).
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a provider with custom rate limiting.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
        })
    }

    /// Fetch daily adjusted closes for `symbol` over `[start, end]` inclusive.
    ///
    /// # Errors
    /// [`DataError::MissingData`] when Yahoo returns no quotes for the range; other variants for
    /// invalid input or transport failures.
    pub async fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        if start > end {
            return Err(DataError::InvalidDateRange { start, end });
        }

        if symbol.trim().is_empty() {
            return Err(DataError::InvalidSymbol(symbol.to_string()));
        }

        // Yahoo treats the end bound as exclusive.
        let start_time = to_offset_datetime(start)?;
        let end_time = to_offset_datetime(end + ChronoDuration::days(1))?;

        debug!(symbol, %start, %end, "Requesting quotes from Yahoo Finance");
        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;

        let quotes = response.quotes().map_err(|e| DataError::MissingData {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;

        let series = quotes_to_series(
            symbol,
            quotes.iter().map(|q| (q.timestamp, q.adjclose)),
            start,
            end,
        )?;

        sleep(self.rate_limit_delay).await;

        Ok(series)
    }
}

fn to_offset_datetime(date: NaiveDate) -> Result<time::OffsetDateTime> {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DataError::TimeConversion(format!("Invalid midnight for {date}")))?
        .and_utc()
        .timestamp();
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::TimeConversion(e.to_string()))
}

/// Turn `(unix timestamp, adjusted close)` pairs into a price series restricted to
/// `[start, end]`.
fn quotes_to_series(
    symbol: &str,
    quotes: impl IntoIterator<Item = (i64, f64)>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries> {
    let mut points = Vec::new();
    for (timestamp, adjusted_close) in quotes {
        let date = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| DataError::TimeConversion(format!("Invalid timestamp {timestamp}")))?
            .date_naive();
        if date >= start && date <= end {
            points.push(PricePoint::new(date, adjusted_close));
        }
    }

    if points.is_empty() {
        return Err(DataError::MissingData {
            symbol: symbol.to_string(),
            reason: "No data returned from Yahoo Finance".to_string(),
        });
    }

    Ok(PriceSeries::new(symbol, points))
}
