//! SQLite caching layer for adjusted closes.
//!
//! Two tables back the cache. `quotes` stores one adjusted close per symbol and date.
//! `fetch_log` remembers every range that was requested from the upstream source, including
//! the ones for which nothing came back, so that a later request lying inside an earlier one
//! never goes back to the network.

use crate::error::{DataError, Result};
use broome_study::{PricePoint, PriceSeries};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// SQLite cache for price data.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

/// A range previously requested from the upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRecord {
    /// First requested date
    pub start: NaiveDate,
    /// Last requested date
    pub end: NaiveDate,
    /// Whether the source returned any data for the range
    pub available: bool,
}

impl SqliteCache {
    /// Open (or create) a cache at `path`, creating parent directories as needed.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                adjusted_close REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quotes_symbol_date ON quotes(symbol, date)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fetch_log (
                symbol TEXT NOT NULL,
                range_start TEXT NOT NULL,
                range_end TEXT NOT NULL,
                available INTEGER NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (symbol, range_start, range_end)
            )",
            [],
        )?;

        Ok(())
    }

    /// Find a logged fetch whose range contains `[start, end]`.
    ///
    /// When several do, one that found data is preferred.
    pub fn covering_fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<FetchRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT range_start, range_end, available FROM fetch_log
                 WHERE symbol = ?1 AND range_start <= ?2 AND range_end >= ?3
                 ORDER BY available DESC, fetched_at DESC
                 LIMIT 1",
                params![symbol, start.to_string(), end.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(start, end, available)| {
            Ok(FetchRecord {
                start: parse_date(&start)?,
                end: parse_date(&end)?,
                available,
            })
        })
        .transpose()
    }

    /// Log a fetch of `[start, end]` for `symbol`.
    pub fn record_fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        available: bool,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO fetch_log (symbol, range_start, range_end, available, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                symbol,
                start.to_string(),
                end.to_string(),
                available,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Get cached closes for `symbol` within `[start, end]`.
    ///
    /// Returns `None` when nothing is cached for the range.
    pub fn get_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PriceSeries>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, adjusted_close
             FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![symbol, start.to_string(), end.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut points = Vec::new();
        for row in rows {
            let (date, adjusted_close) = row?;
            points.push(PricePoint::new(parse_date(&date)?, adjusted_close));
        }

        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(PriceSeries::new(symbol, points)))
    }

    /// Store a price series in the cache, replacing existing closes for the same dates.
    pub fn put_prices(&self, series: &PriceSeries) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        for point in series.points() {
            if !point.adjusted_close.is_finite() {
                return Err(DataError::Cache(format!(
                    "Non-finite close for {} on {}",
                    series.symbol(),
                    point.date
                )));
            }
            tx.execute(
                "INSERT OR REPLACE INTO quotes (symbol, date, adjusted_close, cached_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    series.symbol(),
                    point.date.to_string(),
                    point.adjusted_close,
                    cached_at
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM quotes", [])?;
        self.conn.execute("DELETE FROM fetch_log", [])?;
        Ok(())
    }

    /// Clear cached data for a specific symbol.
    pub fn clear_symbol(&self, symbol: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM quotes WHERE symbol = ?1", params![symbol])?;
        self.conn
            .execute("DELETE FROM fetch_log WHERE symbol = ?1", params![symbol])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let quotes_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

        let symbols_count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT symbol) FROM quotes", [], |row| {
                    row.get(0)
                })?;

        let fetch_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fetch_log", [], |row| row.get(0))?;

        let unavailable_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM fetch_log WHERE available = 0",
            [],
            |row| row.get(0),
        )?;

        Ok(CacheStats {
            total_quotes: quotes_count as usize,
            unique_symbols: symbols_count as usize,
            logged_fetches: fetch_count as usize,
            unavailable_fetches: unavailable_count as usize,
        })
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DataError::CorruptEntry(format!("date {value}: {e}")))
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of quote records
    pub total_quotes: usize,
    /// Number of unique symbols
    pub unique_symbols: usize,
    /// Number of logged upstream fetches
    pub logged_fetches: usize,
    /// Logged fetches that returned no data
    pub unavailable_fetches: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::from_pairs(
            "AAPL",
            [
                (date(2024, 1, 2), 185.64),
                (date(2024, 1, 3), 184.25),
                (date(2024, 1, 4), 181.91),
                (date(2024, 1, 5), 181.18),
            ],
        )
    }

    #[test]
    fn test_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[test]
    fn test_price_round_trip() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_prices(&sample_series()).unwrap();

        let cached = cache
            .get_prices("AAPL", date(2024, 1, 3), date(2024, 1, 4))
            .unwrap()
            .unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached.points()[0].date, date(2024, 1, 3));
        assert_eq!(cached.points()[1].adjusted_close, 181.91);

        let missing = cache
            .get_prices("MSFT", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_put_prices_replaces_existing() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_prices(&sample_series()).unwrap();
        cache
            .put_prices(&PriceSeries::from_pairs("AAPL", [(date(2024, 1, 2), 190.0)]))
            .unwrap();

        let cached = cache
            .get_prices("AAPL", date(2024, 1, 2), date(2024, 1, 2))
            .unwrap()
            .unwrap();
        assert_eq!(cached.points()[0].adjusted_close, 190.0);
        assert_eq!(cache.get_stats().unwrap().total_quotes, 4);
    }

    #[test]
    fn test_put_prices_rejects_non_finite() {
        let cache = SqliteCache::in_memory().unwrap();
        let series = PriceSeries::from_pairs("AAPL", [(date(2024, 1, 2), f64::NAN)]);
        assert!(matches!(
            cache.put_prices(&series),
            Err(DataError::Cache(_))
        ));
    }

    #[test]
    fn test_covering_fetch() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .record_fetch("AAPL", date(2024, 1, 1), date(2024, 6, 30), true)
            .unwrap();

        let inside = cache
            .covering_fetch("AAPL", date(2024, 2, 1), date(2024, 3, 1))
            .unwrap();
        assert_eq!(
            inside,
            Some(FetchRecord {
                start: date(2024, 1, 1),
                end: date(2024, 6, 30),
                available: true,
            })
        );

        let overlapping = cache
            .covering_fetch("AAPL", date(2024, 6, 1), date(2024, 7, 15))
            .unwrap();
        assert!(overlapping.is_none());

        let other_symbol = cache
            .covering_fetch("MSFT", date(2024, 2, 1), date(2024, 3, 1))
            .unwrap();
        assert!(other_symbol.is_none());
    }

    #[test]
    fn test_unavailable_fetch_is_remembered() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .record_fetch("DELISTED", date(2020, 1, 1), date(2020, 12, 31), false)
            .unwrap();

        let record = cache
            .covering_fetch("DELISTED", date(2020, 3, 1), date(2020, 4, 1))
            .unwrap()
            .unwrap();
        assert!(!record.available);
        assert_eq!(cache.get_stats().unwrap().unavailable_fetches, 1);
    }

    #[test]
    fn test_cache_stats() {
        let cache = SqliteCache::in_memory().unwrap();

        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.total_quotes, 0);
        assert_eq!(stats.unique_symbols, 0);
        assert_eq!(stats.logged_fetches, 0);

        cache.put_prices(&sample_series()).unwrap();
        cache
            .put_prices(&PriceSeries::from_pairs("^GSPC", [(date(2024, 1, 2), 4742.83)]))
            .unwrap();
        cache
            .record_fetch("AAPL", date(2024, 1, 1), date(2024, 1, 31), true)
            .unwrap();

        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.total_quotes, 5);
        assert_eq!(stats.unique_symbols, 2);
        assert_eq!(stats.logged_fetches, 1);
        assert_eq!(stats.unavailable_fetches, 0);
    }

    #[test]
    fn test_clear_operations() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_prices(&sample_series()).unwrap();
        cache
            .put_prices(&PriceSeries::from_pairs("^GSPC", [(date(2024, 1, 2), 4742.83)]))
            .unwrap();
        cache
            .record_fetch("AAPL", date(2024, 1, 1), date(2024, 1, 31), true)
            .unwrap();

        cache.clear_symbol("AAPL").unwrap();
        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.total_quotes, 1);
        assert_eq!(stats.logged_fetches, 0);

        cache.clear_all().unwrap();
        assert_eq!(cache.get_stats().unwrap().total_quotes, 0);
    }

    #[test]
    fn test_on_disk_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("broome.db");

        {
            let cache = SqliteCache::new(&path).unwrap();
            cache.put_prices(&sample_series()).unwrap();
        }

        let reopened = SqliteCache::new(&path).unwrap();
        assert_eq!(reopened.get_stats().unwrap().total_quotes, 4);
    }
}
