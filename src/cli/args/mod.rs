//! Shared CLI argument types
//!
//! Argument structs here are flattened into commands or passed to handlers
//! as a unit.

mod common;
mod global;
mod scan;

pub use common::OutputFormat;
pub use global::GlobalOptions;
pub use scan::ScanArgs;
