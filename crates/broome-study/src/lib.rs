#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/broome/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod abnormal;
pub mod error;
pub mod market_model;
pub mod series;
pub mod study;
pub mod window;

// Re-export main types
pub use abnormal::{AbnormalReturnWindow, AbnormalRow, compose};
pub use error::{Result, StudyError};
pub use market_model::{EstimationConfig, MarketModelEstimator, MarketModelFit};
pub use series::{PricePoint, PriceSeries, ReturnPoint, ReturnSeries, build_returns};
pub use study::{EventStudy, PriceBook, PriceSource, StudyConfig};
pub use window::{CombinedObservation, DriftMode, EventWindow, WindowRow, align, combine_returns};
