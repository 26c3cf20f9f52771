//! Concurrent event processing.
//!
//! The benchmark index is fetched once over the union of every event's required range. Each
//! event then fetches its own stock prices and runs the study against a price book holding
//! both series. Events run through `buffer_unordered` and are returned in input order.
//!
//! Nothing here aborts the batch: a rejected event row, a failed index fetch and a failed
//! stock fetch all end up in the affected outcomes.

use broome::data::{CachedPriceFetcher, DataError, QuoteSource};
use broome::output::{EventResultExport, EventStatus, RecordError};
use broome::study::{
    AbnormalReturnWindow, EventStudy, PriceBook, PriceSeries, StudyConfig, StudyError,
};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Default number of concurrent events.
pub(crate) const DEFAULT_CONCURRENCY: usize = 10;

/// Error type for event pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    /// Price retrieval failed.
    #[error("Data fetch error: {0}")]
    Fetch(#[from] DataError),
    /// Benchmark index prices could not be retrieved.
    #[error("Index {symbol} could not be fetched: {reason}")]
    IndexFetch {
        /// Index symbol
        symbol: String,
        /// Underlying fetch error
        reason: String,
    },
    /// Study could not be set up or run.
    #[error(transparent)]
    Study(#[from] StudyError),
    /// The event row was rejected when the file was read.
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl PipelineError {
    /// Whether the failure reflects the data rather than a malfunction.
    pub(crate) const fn is_no_result(&self) -> bool {
        match self {
            Self::Study(err) => err.is_no_result(),
            Self::Fetch(_) | Self::IndexFetch { .. } | Self::Record(_) => false,
        }
    }
}

/// An event to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EventJob {
    pub index: usize,
    pub ticker: String,
    pub date: Result<NaiveDate, RecordError>,
}

impl EventJob {
    /// Event date for log fields.
    fn date_label(&self) -> String {
        self.date
            .as_ref()
            .map_or_else(|_| "invalid".to_string(), NaiveDate::to_string)
    }
}

/// The result of processing one event.
#[derive(Debug)]
pub(crate) struct EventOutcome {
    pub job: EventJob,
    pub result: Result<AbnormalReturnWindow, PipelineError>,
}

impl EventOutcome {
    /// The abnormal return window, if one was computed.
    pub(crate) fn window(&self) -> Option<&AbnormalReturnWindow> {
        self.result.as_ref().ok()
    }

    /// Serializable record of the outcome.
    pub(crate) fn to_export(&self, index_symbol: &str) -> EventResultExport {
        match &self.result {
            Ok(window) => {
                EventResultExport::from_window(self.job.index, &self.job.ticker, index_symbol, window)
            }
            Err(err) => {
                let status = if err.is_no_result() {
                    EventStatus::NoResult
                } else {
                    EventStatus::Failed
                };
                EventResultExport::without_result(
                    self.job.index,
                    &self.job.ticker,
                    index_symbol,
                    self.job.date.clone().ok(),
                    status,
                    err.to_string(),
                )
            }
        }
    }
}

/// Run every job and return the outcomes ordered by job index.
///
/// An index fetch failure is attached to every event that needed the index.
pub(crate) async fn run_events<Q: QuoteSource>(
    fetcher: &CachedPriceFetcher<Q>,
    jobs: Vec<EventJob>,
    index_symbol: &str,
    config: &StudyConfig,
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> Vec<EventOutcome> {
    let studies: Vec<(EventJob, Result<EventStudy, PipelineError>)> = jobs
        .into_iter()
        .map(|job| {
            let study = match &job.date {
                Ok(date) => EventStudy::new(&job.ticker, *date, index_symbol, config.clone())
                    .map_err(PipelineError::from),
                Err(err) => Err(err.clone().into()),
            };
            (job, study)
        })
        .collect();

    let index_prices = match index_range(studies.iter().filter_map(|(_, s)| s.as_ref().ok())) {
        Some((start, end)) => {
            info!(index = index_symbol, %start, %end, "Fetching index prices");
            fetcher
                .fetch(index_symbol, start, end)
                .await
                .map_err(|err| err.to_string())
        }
        None => Ok(None),
    };
    match &index_prices {
        Ok(Some(_)) => {}
        Ok(None) => warn!(index = index_symbol, "No index prices available"),
        Err(err) => warn!(index = index_symbol, error = %err, "Index fetch failed"),
    }
    let index_prices = index_prices.as_ref().map(Option::as_ref);

    let mut outcomes: Vec<EventOutcome> = stream::iter(studies)
        .map(|(job, study)| async move {
            let result = match (study, index_prices) {
                (Ok(study), Ok(index)) => run_study(fetcher, &study, index).await,
                (Ok(_), Err(reason)) => Err(PipelineError::IndexFetch {
                    symbol: index_symbol.to_string(),
                    reason: reason.clone(),
                }),
                (Err(err), _) => Err(err),
            };
            EventOutcome { job, result }
        })
        .buffer_unordered(concurrency.max(1))
        .inspect(|outcome| {
            match &outcome.result {
                Ok(window) => debug!(
                    ticker = %outcome.job.ticker,
                    date = %outcome.job.date_label(),
                    rows = window.len(),
                    "Event processed"
                ),
                Err(err) if err.is_no_result() => debug!(
                    ticker = %outcome.job.ticker,
                    date = %outcome.job.date_label(),
                    reason = %err,
                    "Event has no result"
                ),
                Err(err) => {
                    let report = || {
                        warn!(
                            ticker = %outcome.job.ticker,
                            date = %outcome.job.date_label(),
                            error = %err,
                            "Event failed"
                        );
                    };
                    match progress {
                        Some(pb) => pb.suspend(report),
                        None => report(),
                    }
                }
            }
            if let Some(pb) = progress {
                pb.inc(1);
            }
        })
        .collect()
        .await;

    outcomes.sort_by_key(|o| o.job.index);
    outcomes
}

/// Fetch the stock's prices and run one study.
async fn run_study<Q: QuoteSource>(
    fetcher: &CachedPriceFetcher<Q>,
    study: &EventStudy,
    index_prices: Option<&PriceSeries>,
) -> Result<AbnormalReturnWindow, PipelineError> {
    let (start, end) = study.required_range();
    let mut book = PriceBook::new();

    if let Some(index) = index_prices {
        book.insert(index.slice(start, end));
    }
    if let Some(stock) = fetcher.fetch(study.symbol(), start, end).await? {
        book.insert(stock);
    }

    Ok(study.calculate_window_abnormal(&book)?)
}

/// Smallest range covering every study's required range.
fn index_range<'a>(
    studies: impl Iterator<Item = &'a EventStudy>,
) -> Option<(NaiveDate, NaiveDate)> {
    studies
        .map(EventStudy::required_range)
        .reduce(|(s1, e1), (s2, e2)| (s1.min(s2), e1.max(e2)))
}
