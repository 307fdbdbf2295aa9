//! Finding Catalog display model

use serde::Serialize;
use tabled::Tabled;

use crate::catalog::CatalogEntry;

#[derive(Debug, Clone, Tabled, Serialize)]
pub struct CatalogDisplay {
    #[tabled(rename = "CATEGORY")]
    pub category: String,

    #[tabled(rename = "TITLE")]
    pub title: String,

    #[tabled(rename = "DEFAULT SEVERITY")]
    pub severity: String,

    #[tabled(rename = "CWE")]
    pub cwe: String,

    #[tabled(rename = "CVSS")]
    pub cvss: String,

    #[tabled(skip)]
    pub remediation: String,
}

impl From<&CatalogEntry> for CatalogDisplay {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            category: entry.category.to_string(),
            title: entry.title.to_string(),
            severity: entry.default_severity.label().to_string(),
            cwe: entry.cwe.join(", "),
            cvss: format!("{:.1}", entry.cvss),
            remediation: entry.remediation.to_string(),
        }
    }
}
