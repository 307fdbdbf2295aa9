//! HTTP test modules, one per check category.
//!
//! Every module fans out over its sampled locations with bounded concurrency
//! and folds the per-location outcomes with [`collect`].

use std::collections::HashSet;

use log::debug;

use crate::error::{Result, ScanError};
use crate::models::{Finding, TestCategory};

mod csrf;
mod headers;
mod sqli;
mod upload;
mod xss;

pub use csrf::CsrfModule;
pub use headers::HeadersModule;
pub use sqli::SqliModule;
pub use upload::UploadModule;
pub use xss::XssModule;

/// Fold per-location outcomes into the module's findings.
///
/// Locations that failed are skipped unless all of them did, which means the
/// module could not reach anything and the run is reported as failed.
pub(crate) fn collect(
    kind: TestCategory,
    outcomes: Vec<Result<Vec<Finding>>>,
) -> Result<Vec<Finding>> {
    let attempted = outcomes.len();
    let mut failures = 0usize;
    let mut last_error = None;
    let mut seen = HashSet::new();
    let mut findings = Vec::new();

    for outcome in outcomes {
        match outcome {
            Ok(batch) => {
                for finding in batch {
                    if seen.insert(finding.id.clone()) {
                        findings.push(finding);
                    }
                }
            }
            Err(e) => {
                failures += 1;
                last_error = Some(e.to_string());
            }
        }
    }

    if attempted > 0 && failures == attempted {
        return Err(ScanError::TestModuleFailure {
            category: kind.label().to_string(),
            message: format!(
                "none of {} locations could be probed ({})",
                attempted,
                last_error.unwrap_or_default()
            ),
        }
        .into());
    }

    debug!(
        "{} module: {} findings from {} locations ({} failed)",
        kind,
        findings.len(),
        attempted,
        failures
    );
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FindingBuilder;
    use crate::models::Category;

    #[test]
    fn test_collect_dedupes_by_id() {
        let finding = FindingBuilder::new(Category::Xss).build();
        let outcomes = vec![Ok(vec![finding.clone()]), Ok(vec![finding])];
        let findings = collect(TestCategory::Xss, outcomes).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_collect_tolerates_partial_failure() {
        let outcomes = vec![
            Err(ScanError::Network("refused".to_string()).into()),
            Ok(vec![FindingBuilder::new(Category::Csrf).build()]),
        ];
        let findings = collect(TestCategory::Csrf, outcomes).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_collect_all_failed() {
        let outcomes = vec![
            Err(ScanError::Network("refused".to_string()).into()),
            Err(ScanError::Network("reset".to_string()).into()),
        ];
        let err = collect(TestCategory::Sqli, outcomes).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SQL injection tests failed"));
        assert!(msg.contains("reset"));
    }

    #[test]
    fn test_collect_nothing_attempted() {
        let findings = collect(TestCategory::Headers, Vec::new()).unwrap();
        assert!(findings.is_empty());
    }
}
