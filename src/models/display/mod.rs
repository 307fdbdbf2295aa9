//! Display models for table and JSON output
//!
//! Display models adapt the scan data model into CLI-friendly rows with
//! column names and truncated values.

mod catalog;
mod common;
mod finding;
mod scan;

pub use catalog::CatalogDisplay;
pub use common::{colored_severity, truncate_string};
pub use finding::FindingDisplay;
pub use scan::{HistoryDisplay, SummaryView};
