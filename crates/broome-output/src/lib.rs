#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/broome/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod export;
pub mod report;
pub mod table;

pub use error::{OutputError, RecordError, Result};
pub use events::{EventFile, EventRecord};
pub use export::{EventResultExport, EventStatus, ExportFormat, Exporter, WindowRowExport};
pub use report::EventReport;
pub use table::{ResultTable, write_csv};
