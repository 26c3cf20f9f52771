//! Caching layer for price data.

pub mod sqlite;

pub use sqlite::{CacheStats, FetchRecord, SqliteCache};
