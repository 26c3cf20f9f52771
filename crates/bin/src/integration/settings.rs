//! Study and fetch settings from command-line flags and an optional JSON file.

use broome::data::FetchConfig;
use broome::study::{DriftMode, StudyConfig, StudyError};
use clap::Args;
use std::path::PathBuf;

/// Error type for settings assembly.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SettingsError {
    /// Config file could not be read.
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not a valid study configuration.
    #[error("Invalid config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Resulting configuration is unusable.
    #[error(transparent)]
    Study(#[from] StudyError),
}

/// Flags shared by every command that runs a study.
#[derive(Debug, Clone, Args)]
pub(crate) struct StudyArgs {
    /// Benchmark index the stock is measured against
    #[arg(long, default_value = "^GSPC")]
    pub stock_index: String,

    /// Half-width of the event window [default: 10]
    #[arg(long)]
    pub window_size: Option<u32>,

    /// Days between the estimation period and the event [default: 50]
    #[arg(long)]
    pub window_distance: Option<u32>,

    /// Observations used to fit the market model [default: 200]
    #[arg(long)]
    pub estimation_period: Option<u32>,

    /// Estimation lookback in multiples of the estimation period [default: 2]
    #[arg(long)]
    pub lookback_multiplier: Option<u32>,

    /// Count drift in calendar days instead of trading days
    #[arg(long)]
    pub calendar_day: bool,

    /// JSON file with study settings; explicit flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable caching (always fetch fresh data)
    #[arg(long)]
    pub no_cache: bool,

    /// Force refresh cached data
    #[arg(long)]
    pub refresh: bool,
}

impl StudyArgs {
    /// Study configuration: defaults, then the config file, then flags.
    pub(crate) fn study_config(&self) -> Result<StudyConfig, SettingsError> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str(&raw).map_err(|source| SettingsError::Json {
                    path: path.clone(),
                    source,
                })?
            }
            None => StudyConfig::default(),
        };

        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.window_distance {
            config.window_distance = v;
        }
        if let Some(v) = self.estimation_period {
            config.estimation_period = v;
        }
        if let Some(v) = self.lookback_multiplier {
            config.lookback_multiplier = v;
        }
        if self.calendar_day {
            config.mode = DriftMode::CalendarDay;
        }

        config.validate()?;
        Ok(config)
    }

    /// Cache behaviour selected by `--no-cache` and `--refresh`.
    pub(crate) const fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            use_cache: !self.no_cache,
            force_refresh: self.refresh,
        }
    }
}
