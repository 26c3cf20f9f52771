//! Cache-first price retrieval.

use crate::cache::SqliteCache;
use crate::error::{DataError, Result};
use crate::yahoo::YahooQuoteProvider;
use broome_study::PriceSeries;
use chrono::{Days, NaiveDate, Utc};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Longest run of calendar days without a trading session, weekends and holidays included.
const MAX_CLOSED_DAYS: u64 = 4;

/// Upstream source of adjusted closes.
pub trait QuoteSource {
    /// Fetch adjusted closes for `symbol` over `[start, end]` inclusive.
    ///
    /// An empty result must be reported as [`DataError::MissingData`].
    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<PriceSeries>>;
}

impl QuoteSource for YahooQuoteProvider {
    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<PriceSeries>> {
        Self::fetch_prices(self, symbol, start, end)
    }
}

/// Configuration for price fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Whether to read from and write to the cache
    pub use_cache: bool,
    /// Whether to bypass cached data and fetch again
    pub force_refresh: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
        }
    }
}

/// Price fetcher that serves covered ranges from a [`SqliteCache`] and everything else from
/// an upstream [`QuoteSource`].
#[derive(Debug)]
pub struct CachedPriceFetcher<Q = YahooQuoteProvider> {
    source: Q,
    cache: Mutex<SqliteCache>,
    config: FetchConfig,
}

impl<Q: QuoteSource> CachedPriceFetcher<Q> {
    /// Create a fetcher over `source` and `cache`.
    pub const fn new(source: Q, cache: SqliteCache, config: FetchConfig) -> Self {
        Self {
            source,
            cache: Mutex::new(cache),
            config,
        }
    }

    /// Fetch configuration.
    pub const fn config(&self) -> FetchConfig {
        self.config
    }

    /// Adjusted closes for `symbol` within `[start, end]`, or `None` when the source has none.
    ///
    /// Only the part of the range the source actually covered is logged in the cache, so a
    /// range that runs past the end of the available history is fetched again later. Missing
    /// data is remembered only for ranges that lie entirely in the past.
    ///
    /// # Errors
    /// Cache failures and upstream failures other than missing data.
    pub async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PriceSeries>> {
        if self.config.use_cache && !self.config.force_refresh {
            let cache = self.lock_cache()?;
            if let Some(record) = cache.covering_fetch(symbol, start, end)? {
                debug!(
                    symbol,
                    %start,
                    %end,
                    available = record.available,
                    "Serving prices from cache"
                );
                if !record.available {
                    return Ok(None);
                }
                return cache.get_prices(symbol, start, end);
            }
        }

        match self.source.fetch_prices(symbol, start, end).await {
            Ok(series) => {
                debug!(symbol, points = series.len(), "Fetched prices");
                if self.config.use_cache {
                    let cache = self.lock_cache()?;
                    cache.put_prices(&series)?;
                    let covered = covered_end(end, series.last_date());
                    if covered >= start {
                        cache.record_fetch(symbol, start, covered, true)?;
                    }
                }
                Ok(Some(series))
            }
            Err(err) if err.is_missing_data() => {
                info!(symbol, %start, %end, "No price data available");
                if self.config.use_cache && end < Utc::now().date_naive() {
                    self.lock_cache()?
                        .record_fetch(symbol, start, end, false)?;
                }
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Run `f` against the underlying cache.
    pub fn with_cache<T>(&self, f: impl FnOnce(&SqliteCache) -> Result<T>) -> Result<T> {
        let cache = self.lock_cache()?;
        f(&cache)
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, SqliteCache>> {
        self.cache
            .lock()
            .map_err(|e| DataError::Cache(format!("Cache lock poisoned: {e}")))
    }
}

/// Last day of `[start, end]` that the returned series is known to cover.
///
/// A gap after the last quote no longer than a market closure still counts as covered.
fn covered_end(end: NaiveDate, last_quote: Option<NaiveDate>) -> NaiveDate {
    match last_quote {
        Some(last) if last < end => match last.checked_add_days(Days::new(MAX_CLOSED_DAYS)) {
            Some(settled) if settled >= end => end,
            _ => last,
        },
        _ => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Serves a fixed daily series for "AAPL" and nothing for any other symbol.
    #[derive(Debug, Default)]
    struct StubSource {
        calls: AtomicUsize,
    }

    impl StubSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QuoteSource for StubSource {
        async fn fetch_prices(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol != "AAPL" {
                return Err(DataError::MissingData {
                    symbol: symbol.to_string(),
                    reason: "No data returned from Yahoo Finance".to_string(),
                });
            }
            let series = PriceSeries::from_pairs(
                symbol,
                start
                    .iter_days()
                    .take_while(|d| *d <= end)
                    .enumerate()
                    .map(|(i, d)| (d, 100.0 + i as f64)),
            );
            Ok(series)
        }
    }

    /// Serves daily "AAPL" prices up to a last day that can be moved forward.
    #[derive(Debug)]
    struct GrowingHistory {
        last_day: Mutex<NaiveDate>,
        calls: AtomicUsize,
    }

    impl GrowingHistory {
        fn until(last_day: NaiveDate) -> Self {
            Self {
                last_day: Mutex::new(last_day),
                calls: AtomicUsize::new(0),
            }
        }

        fn extend_to(&self, last_day: NaiveDate) {
            *self.last_day.lock().unwrap() = last_day;
        }
    }

    impl QuoteSource for GrowingHistory {
        async fn fetch_prices(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last_day = *self.last_day.lock().unwrap();
            let series = PriceSeries::from_pairs(
                symbol,
                start
                    .iter_days()
                    .take_while(|d| *d <= end.min(last_day))
                    .map(|d| (d, 100.0)),
            );
            if series.is_empty() {
                return Err(DataError::MissingData {
                    symbol: symbol.to_string(),
                    reason: "No data returned from Yahoo Finance".to_string(),
                });
            }
            Ok(series)
        }
    }

    fn fetcher(config: FetchConfig) -> CachedPriceFetcher<StubSource> {
        CachedPriceFetcher::new(
            StubSource::default(),
            SqliteCache::in_memory().unwrap(),
            config,
        )
    }

    #[tokio::test]
    async fn test_covered_range_served_from_cache() {
        let fetcher = fetcher(FetchConfig::default());

        let first = fetcher
            .fetch("AAPL", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), 31);

        let inner = fetcher
            .fetch("AAPL", date(2024, 1, 10), date(2024, 1, 12))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inner.len(), 3);
        assert_eq!(inner.points()[0].adjusted_close, 109.0);
        assert_eq!(fetcher.source.calls(), 1);

        // Extends past the logged range, so it goes upstream again.
        fetcher
            .fetch("AAPL", date(2024, 1, 20), date(2024, 2, 5))
            .await
            .unwrap();
        assert_eq!(fetcher.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_data_is_none_and_remembered() {
        let fetcher = fetcher(FetchConfig::default());

        let first = fetcher
            .fetch("NOPE", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap();
        assert!(first.is_none());

        let second = fetcher
            .fetch("NOPE", date(2024, 1, 5), date(2024, 1, 6))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(fetcher.source.calls(), 1);

        let stats = fetcher.with_cache(SqliteCache::get_stats).unwrap();
        assert_eq!(stats.unavailable_fetches, 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let fetcher = fetcher(FetchConfig {
            use_cache: true,
            force_refresh: true,
        });

        for _ in 0..2 {
            fetcher
                .fetch("AAPL", date(2024, 1, 1), date(2024, 1, 5))
                .await
                .unwrap();
        }
        assert_eq!(fetcher.source.calls(), 2);
        let stats = fetcher.with_cache(SqliteCache::get_stats).unwrap();
        assert_eq!(stats.total_quotes, 5);
    }

    #[tokio::test]
    async fn test_no_cache_leaves_database_empty() {
        let fetcher = fetcher(FetchConfig {
            use_cache: false,
            force_refresh: false,
        });

        fetcher
            .fetch("AAPL", date(2024, 1, 1), date(2024, 1, 5))
            .await
            .unwrap();
        fetcher
            .fetch("AAPL", date(2024, 1, 1), date(2024, 1, 5))
            .await
            .unwrap();

        assert_eq!(fetcher.source.calls(), 2);
        let stats = fetcher.with_cache(SqliteCache::get_stats).unwrap();
        assert_eq!(stats.total_quotes, 0);
        assert_eq!(stats.logged_fetches, 0);
    }

    #[tokio::test]
    async fn test_history_past_last_quote_fetched_again() {
        let fetcher = CachedPriceFetcher::new(
            GrowingHistory::until(date(2024, 1, 10)),
            SqliteCache::in_memory().unwrap(),
            FetchConfig::default(),
        );

        let early = fetcher
            .fetch("AAPL", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(early.len(), 10);

        fetcher.source.extend_to(date(2024, 1, 31));
        let later = fetcher
            .fetch("AAPL", date(2024, 1, 5), date(2024, 1, 25))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(later.len(), 21);
        assert_eq!(fetcher.source.calls.load(Ordering::SeqCst), 2);

        // Inside the history seen by the first request.
        fetcher
            .fetch("AAPL", date(2024, 1, 2), date(2024, 1, 8))
            .await
            .unwrap();
        assert_eq!(fetcher.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_covered_end_tolerates_market_closures() {
        // Range ends on a Sunday after a Friday close.
        assert_eq!(
            covered_end(date(2024, 3, 31), Some(date(2024, 3, 29))),
            date(2024, 3, 31)
        );
        assert_eq!(
            covered_end(date(2024, 1, 31), Some(date(2024, 1, 10))),
            date(2024, 1, 10)
        );
        assert_eq!(covered_end(date(2024, 1, 31), None), date(2024, 1, 31));
        assert_eq!(
            covered_end(date(2024, 1, 31), Some(date(2024, 1, 31))),
            date(2024, 1, 31)
        );
    }

    #[tokio::test]
    async fn test_missing_future_range_not_remembered() {
        let fetcher = fetcher(FetchConfig::default());
        let today = Utc::now().date_naive();
        let start = today.checked_sub_days(Days::new(3)).unwrap();
        let end = today.checked_add_days(Days::new(3)).unwrap();

        for _ in 0..2 {
            let none = fetcher.fetch("NOPE", start, end).await.unwrap();
            assert!(none.is_none());
        }
        assert_eq!(fetcher.source.calls(), 2);
        let stats = fetcher.with_cache(SqliteCache::get_stats).unwrap();
        assert_eq!(stats.unavailable_fetches, 0);
    }
}
