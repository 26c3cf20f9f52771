//! Error types for data operations.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised while fetching or caching prices.
///
/// [`DataError::MissingData`] is the only variant that describes the market rather than a
/// malfunction: the upstream source has no quotes for the request.
#[derive(Debug, Error)]
pub enum DataError {
    /// Yahoo Finance request failed
    #[error("Yahoo Finance request failed: {0}")]
    YahooApi(String),

    /// SQLite failure
    #[error("Price cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored date could not be read back
    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),

    /// Requested range ends before it starts
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// First requested day
        start: NaiveDate,
        /// Last requested day
        end: NaiveDate,
    },

    /// No quotes for the request
    #[error("No quotes for {symbol}: {reason}")]
    MissingData {
        /// Symbol that was queried
        symbol: String,
        /// What the source reported
        reason: String,
    },

    /// Date could not be converted to or from a Yahoo timestamp
    #[error("Timestamp conversion failed: {0}")]
    TimeConversion(String),

    /// Symbol rejected before querying
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// Cache could not be used
    #[error("Price cache unavailable: {0}")]
    Cache(String),

    /// Filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Whether the error only means the source has nothing for the request.
    pub const fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }
}

impl From<yahoo_finance_api::YahooError> for DataError {
    fn from(err: yahoo_finance_api::YahooError) -> Self {
        Self::YahooApi(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_classification() {
        let missing = DataError::MissingData {
            symbol: "XYZ".to_string(),
            reason: "No data returned from Yahoo Finance".to_string(),
        };
        assert!(missing.is_missing_data());
        assert_eq!(
            missing.to_string(),
            "No quotes for XYZ: No data returned from Yahoo Finance"
        );

        let range = DataError::InvalidDateRange {
            start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert!(!range.is_missing_data());
        assert_eq!(
            range.to_string(),
            "Invalid date range: 2024-02-01 is after 2024-01-01"
        );
    }
}
