#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/broome/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export main types from sub-crates
pub use broome_data as data;
pub use broome_output as output;
pub use broome_study as study;

pub use broome_study::{
    AbnormalReturnWindow, DriftMode, EventStudy, MarketModelFit, PriceSource, StudyConfig,
    StudyError,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
