#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/broome/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod yahoo;

pub use cache::{CacheStats, FetchRecord, SqliteCache};
pub use error::{DataError, Result};
pub use fetcher::{CachedPriceFetcher, FetchConfig, QuoteSource};
pub use yahoo::YahooQuoteProvider;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
