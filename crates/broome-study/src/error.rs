//! Error types for event study computations.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for event study computations.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Errors that can occur while computing an event study.
///
/// Apart from [`StudyError::InvalidConfig`] and [`StudyError::Source`], every variant describes
/// a data-driven "no result" outcome for a single event. A batch driver records those and moves
/// on to the next event.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Invalid study configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A price series contained no observations
    #[error("Insufficient data for {symbol}: price series is empty")]
    InsufficientData {
        /// Symbol whose series was empty
        symbol: String,
    },

    /// The price source reported no data for the requested range
    #[error("No price data available for {symbol} between {start} and {end}")]
    DataUnavailable {
        /// Symbol that was queried
        symbol: String,
        /// Start of the requested range
        start: NaiveDate,
        /// End of the requested range
        end: NaiveDate,
    },

    /// The security and index series share no trading days
    #[error("Security and index have no common trading days")]
    NoObservations,

    /// No joint trading day exists on or after the event date
    #[error("No joint trading day on or after event date {event_date}")]
    NoValidAnchor {
        /// The event date
        event_date: NaiveDate,
    },

    /// The estimation period holds too few usable observations
    #[error(
        "Estimation unavailable: need at least {required} joint observations, got {actual}"
    )]
    EstimationUnavailable {
        /// Minimum number of observations
        required: usize,
        /// Observations found in the estimation period
        actual: usize,
    },

    /// Index returns have zero variance over the estimation period
    #[error("Degenerate regression: index returns have zero variance")]
    DegenerateRegression,

    /// The price source failed
    #[error("Price source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StudyError {
    /// Whether this error is a per-event "no result" rather than a hard failure.
    #[must_use]
    pub const fn is_no_result(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_) | Self::Source(_))
    }

    /// Short machine-readable label for reports.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::NoObservations => "no_observations",
            Self::NoValidAnchor { .. } => "no_valid_anchor",
            Self::EstimationUnavailable { .. } => "estimation_unavailable",
            Self::DegenerateRegression => "degenerate_regression",
            Self::Source(_) => "source_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_result_classification() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(StudyError::NoValidAnchor { event_date: date }.is_no_result());
        assert!(StudyError::NoObservations.is_no_result());
        assert!(
            StudyError::EstimationUnavailable {
                required: 2,
                actual: 1
            }
            .is_no_result()
        );
        assert!(!StudyError::InvalidConfig("bad".to_string()).is_no_result());
    }

    #[test]
    fn test_error_display() {
        let err = StudyError::EstimationUnavailable {
            required: 2,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "Estimation unavailable: need at least 2 joint observations, got 0"
        );
        assert_eq!(err.kind(), "estimation_unavailable");
    }
}
