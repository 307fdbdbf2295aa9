//! CSV export: one row per finding

use crate::models::{Finding, ScanResult};

/// Text of the placeholder row written for a result without findings
pub const NO_FINDINGS_ROW: &str = "No vulnerabilities found";

const HEADER: [&str; 13] = [
    "ID",
    "Severity",
    "Category",
    "Title",
    "Location",
    "Parameter",
    "Payload",
    "Evidence",
    "Description",
    "Remediation",
    "CWE",
    "CVSS",
    "Status",
];

/// Render findings as CSV, most severe first.
///
/// Embedded line breaks are flattened so every record occupies one line.
pub fn render_csv(result: &ScanResult) -> String {
    let mut writer = ::csv::Writer::from_writer(vec![]);

    // Writes into a Vec<u8> cannot fail
    let _ = writer.write_record(HEADER);

    if result.findings.is_empty() {
        let mut row = vec![String::new(); HEADER.len()];
        row[3] = NO_FINDINGS_ROW.to_string();
        row[4] = result.config.target_url.clone();
        let _ = writer.write_record(&row);
    }

    for finding in result.findings_by_severity() {
        let _ = writer.write_record(record(finding));
    }

    let bytes = writer.into_inner().unwrap_or_default();
    String::from_utf8(bytes).unwrap_or_default()
}

fn record(finding: &Finding) -> [String; 13] {
    [
        finding.id.clone(),
        finding.severity.as_str().to_string(),
        finding.category.to_string(),
        flatten(&finding.title),
        flatten(&finding.location),
        flatten(finding.parameter.as_deref().unwrap_or("")),
        flatten(finding.payload.as_deref().unwrap_or("")),
        flatten(&finding.evidence),
        flatten(&finding.description),
        flatten(&finding.remediation),
        finding.cwe_list(),
        finding.cvss.map(|c| format!("{:.1}", c)).unwrap_or_default(),
        finding.status.to_string(),
    ]
}

fn flatten(text: &str) -> String {
    text.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
