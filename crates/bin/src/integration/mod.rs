//! Glue between the CLI and the library crates.
//!
//! Cache location handling, study configuration assembly and the concurrent event pipeline.

pub(crate) mod cache_manager;
pub(crate) mod event_pipeline;
pub(crate) mod settings;
