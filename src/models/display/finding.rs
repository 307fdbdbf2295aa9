//! Finding display model

use serde::Serialize;
use tabled::Tabled;

use super::common::truncate_string;
use crate::models::Finding;

/// One finding as a table row for `scan` and `history show`
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct FindingDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "SEVERITY")]
    pub severity: String,

    #[tabled(rename = "CATEGORY")]
    pub category: String,

    #[tabled(rename = "LOCATION")]
    pub location: String,

    /// Injected parameter or audited header, `--` when not applicable
    #[tabled(rename = "PARAM")]
    pub parameter: String,

    #[tabled(rename = "EVIDENCE")]
    pub evidence: String,
}

impl From<&Finding> for FindingDisplay {
    fn from(finding: &Finding) -> Self {
        Self {
            id: finding.id.clone(),
            severity: finding.severity.label().to_string(),
            category: finding.category.to_string(),
            location: truncate_string(&finding.location, 50),
            parameter: finding
                .parameter
                .clone()
                .unwrap_or_else(|| "--".to_string()),
            evidence: truncate_string(&finding.evidence.replace('\n', " "), 40),
        }
    }
}
