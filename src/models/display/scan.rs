//! Scan display models and helpers

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use super::common::{colored_severity, truncate_string};
use crate::archive::ArchivedScan;
use crate::models::{ScanResult, Severity};
use crate::output::formatters::{
    format_duration_secs, format_relative, format_severity_counts, format_timestamp_local,
};

/// Archived scan row for `history list`
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct HistoryDisplay {
    #[tabled(rename = "SCAN ID")]
    pub id: String,

    #[tabled(rename = "TARGET")]
    pub target: String,

    #[tabled(rename = "MODE")]
    pub mode: String,

    /// Severity counts, e.g. "1C 2H 0M 1L 0I"
    #[tabled(rename = "FINDINGS")]
    pub findings: String,

    #[tabled(rename = "DURATION")]
    pub duration: String,

    #[tabled(rename = "ARCHIVED")]
    pub archived: String,
}

impl From<ArchivedScan> for HistoryDisplay {
    fn from(scan: ArchivedScan) -> Self {
        let findings = format!(
            "{}C {}H {}M {}L {}I",
            scan.critical, scan.high, scan.medium, scan.low, scan.info
        );
        Self {
            id: scan.scan_id,
            target: truncate_string(&scan.target, 40),
            mode: scan.mode,
            findings,
            duration: format_duration_secs(scan.duration_secs),
            archived: format_relative(scan.archived_at, Utc::now()),
        }
    }
}

/// Multi-section text overview of a completed scan
pub struct SummaryView<'a> {
    pub result: &'a ScanResult,
}

impl<'a> SummaryView<'a> {
    pub fn new(result: &'a ScanResult) -> Self {
        Self { result }
    }

    pub fn format_text(&self) -> String {
        let result = self.result;
        let summary = &result.summary;
        let mut lines = Vec::new();

        lines.push(format!("{}", format!("Scan: {}", result.config.target_url).bold()));
        lines.push("══════════════════════════════════════════════════════".to_string());
        lines.push(format!("ID:        {}", summary.scan_id));
        lines.push(format!("Mode:      {}", summary.mode));
        lines.push(format!("Started:   {}", format_timestamp_local(summary.start_time)));
        lines.push(format!("Duration:  {}", format_duration_secs(summary.duration_secs())));
        lines.push(format!(
            "Coverage:  {} locations, {} parameters, ~{} requests",
            summary.locations_tested, summary.parameters_tested, summary.requests_issued
        ));

        lines.push(String::new());
        lines.push(format!("Findings ({})", format_severity_counts(summary)));
        if let Some(top) = summary.highest_severity() {
            lines.push(format!("Highest:   {}", colored_severity(top)));
        }
        lines.push("────────────────────────────────────────────────────".to_string());
        if summary.total == 0 {
            lines.push(format!("  {}", "No vulnerabilities found".green()));
        } else {
            for severity in Severity::DESCENDING {
                let count = summary.count(severity);
                if count > 0 {
                    lines.push(format!("  {:<10} {:>3}", colored_severity(severity), count));
                }
            }
        }

        if let Some(analysis) = &result.ai_analysis {
            lines.push(String::new());
            lines.push("Analysis".bold().to_string());
            lines.push(format!("  {}", analysis.summary));
        }

        if !result.issues.is_empty() {
            lines.push(String::new());
            lines.push(format!("{}", "Issues".yellow().bold()));
            for issue in &result.issues {
                lines.push(format!("  {}: {}", issue.phase, issue.message));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ScanResultBuilder, fixed_time, sample_result};

    #[test]
    fn test_history_display() {
        let row = HistoryDisplay::from(ArchivedScan {
            scan_id: "abc".to_string(),
            target: "https://example.com".to_string(),
            mode: "quick".to_string(),
            started_at: fixed_time(),
            duration_secs: 75,
            total: 3,
            critical: 1,
            high: 2,
            medium: 0,
            low: 0,
            info: 0,
            archived_at: fixed_time(),
        });
        assert_eq!(row.findings, "1C 2H 0M 0L 0I");
        assert_eq!(row.duration, "1m 15s");
    }

    #[test]
    fn test_summary_view_lists_issues() {
        colored::control::set_override(false);
        let result = ScanResultBuilder::new("https://example.com")
            .issue("discovery", "discovery timed out after 120s")
            .build();
        let text = SummaryView::new(&result).format_text();
        assert!(text.contains("No vulnerabilities found"));
        assert!(text.contains("discovery: discovery timed out"));
    }

    #[test]
    fn test_summary_view_counts() {
        colored::control::set_override(false);
        let text = SummaryView::new(&sample_result()).format_text();
        assert!(text.contains("Highest:   Critical"));
        assert!(text.contains("Analysis"));
    }
}
