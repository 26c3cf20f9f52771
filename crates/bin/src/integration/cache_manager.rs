//! Cache manager for price data.
//!
//! Resolves the SQLite cache location and opens it.

use broome::data::{DataError, SqliteCache};
use std::path::PathBuf;

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/broome/`
/// - macOS: `~/Library/Caches/broome/`
/// - Windows: `%LOCALAPPDATA%\broome\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("broome")
}

/// Get the default cache database path.
pub(crate) fn default_cache_path() -> PathBuf {
    default_cache_dir().join("broome.db")
}

/// Open the on-disk cache, or a throwaway in-memory one when caching is disabled.
pub(crate) fn open_cache(use_cache: bool) -> Result<SqliteCache, DataError> {
    if use_cache {
        SqliteCache::new(default_cache_path())
    } else {
        SqliteCache::in_memory()
    }
}

/// Print cache location and contents.
pub(crate) fn print_cache_info(cache: &SqliteCache) -> Result<(), DataError> {
    let stats = cache.get_stats()?;
    println!("  Cache location: {}", default_cache_path().display());
    println!(
        "  Cached data: {} quotes for {} symbols",
        stats.total_quotes, stats.unique_symbols
    );
    println!(
        "  Fetch log: {} ranges ({} without data)",
        stats.logged_fetches, stats.unavailable_fetches
    );
    Ok(())
}
