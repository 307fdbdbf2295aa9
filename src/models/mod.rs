//! Canonical scan data model and CLI display models
//!
//! One definition per concept: the orchestrator, the report compiler and the
//! CLI all share these types. Display models adapt them for terminal output.

pub mod display;
mod finding;
mod result;
mod scan;

pub use finding::{Category, Finding, FindingStatus, Severity, finding_id};
pub use result::{
    AiAnalysis, CertificateInfo, PhaseIssue, ScanResult, ScanSummary, ServerInfo, SummaryContext,
};
pub use scan::{Credentials, ScanConfig, ScanMode, TestCategory, TestToggles};
