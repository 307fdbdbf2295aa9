//! Deterministic narrative summary of a scan's findings

use async_trait::async_trait;
use url::Url;

use super::Analyst;
use crate::catalog;
use crate::error::Result;
use crate::models::{AiAnalysis, Category, Finding, Severity};

/// Summarises findings from catalog data; no model is involved
pub struct HeuristicAnalyst;

impl HeuristicAnalyst {
    pub const NAME: &'static str = "vulnscope heuristic analyst";

    fn summary(target: &Url, findings: &[Finding]) -> String {
        let host = target.host_str().unwrap_or(target.as_str());
        if findings.is_empty() {
            return format!(
                "No vulnerabilities were detected on {}. Absence of findings covers only the \
                 locations and categories that were tested.",
                host
            );
        }

        let counts: Vec<String> = Severity::DESCENDING
            .into_iter()
            .filter_map(|severity| {
                let n = findings.iter().filter(|f| f.severity == severity).count();
                (n > 0).then(|| format!("{} {}", n, severity))
            })
            .collect();

        let mut text = format!(
            "The scan of {} produced {} finding{} ({}).",
            host,
            findings.len(),
            if findings.len() == 1 { "" } else { "s" },
            counts.join(", ")
        );

        if let Some(worst) = findings.iter().max_by_key(|f| f.severity) {
            text.push_str(&format!(
                " The most severe issue is {} ({}) at {}.",
                worst.title, worst.severity, worst.location
            ));
        }
        text
    }

    /// One action per affected category, most severe category first
    fn remediation(findings: &[Finding]) -> Vec<String> {
        let mut categories: Vec<(Category, Severity, usize)> = Vec::new();
        for finding in findings {
            match categories.iter_mut().find(|(c, _, _)| *c == finding.category) {
                Some(entry) => {
                    entry.1 = entry.1.max(finding.severity);
                    entry.2 += 1;
                }
                None => categories.push((finding.category, finding.severity, 1)),
            }
        }
        categories.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));

        categories
            .into_iter()
            .map(|(category, severity, count)| {
                format!(
                    "[{}] {} ({} affected): {}",
                    severity.label(),
                    category,
                    count,
                    catalog::entry(category).remediation
                )
            })
            .collect()
    }
}

#[async_trait]
impl Analyst for HeuristicAnalyst {
    async fn analyze(&self, target: &Url, findings: &[Finding]) -> Result<AiAnalysis> {
        Ok(AiAnalysis {
            summary: Self::summary(target, findings),
            remediation: Self::remediation(findings),
            generated_by: Self::NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FindingBuilder;

    fn target() -> Url {
        Url::parse("https://shop.example.com/").unwrap()
    }

    #[tokio::test]
    async fn test_analyze_empty() {
        let analysis = HeuristicAnalyst.analyze(&target(), &[]).await.unwrap();
        assert!(analysis.summary.contains("No vulnerabilities"));
        assert!(analysis.remediation.is_empty());
        assert_eq!(analysis.generated_by, HeuristicAnalyst::NAME);
    }

    #[tokio::test]
    async fn test_analyze_orders_by_severity() {
        let findings = vec![
            FindingBuilder::new(Category::Csrf).seq(1).build(),
            FindingBuilder::new(Category::Csrf).seq(2).build(),
            FindingBuilder::new(Category::SqlInjection).build(),
        ];
        let analysis = HeuristicAnalyst.analyze(&target(), &findings).await.unwrap();

        assert!(analysis.summary.contains("3 findings"));
        assert!(analysis.summary.contains("1 critical, 2 medium"));
        assert!(analysis.summary.contains("SQL Injection"));
        assert_eq!(analysis.remediation.len(), 2);
        assert!(analysis.remediation[0].starts_with("[Critical] SQL Injection"));
        assert!(analysis.remediation[1].contains("(2 affected)"));
    }
}
