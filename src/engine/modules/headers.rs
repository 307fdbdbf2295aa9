//! Security header audit and version banner disclosure

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::collect;
use crate::catalog::REQUIRED_HEADERS;
use crate::engine::parallel::map_bounded;
use crate::engine::probe::ProbeResponse;
use crate::engine::{Detection, HttpProbe, TestContext, TestModule, sampling};
use crate::error::Result;
use crate::models::{Category, Finding, Severity, TestCategory};

/// Whether a banner value carries a version number
fn discloses_version(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

/// Findings for one response; headers are reported against the origin root
/// so the same gap on many pages collapses into one finding.
fn audit(response: &ProbeResponse) -> Vec<Finding> {
    let https = response.url.scheme() == "https";
    let mut origin = response.url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    let location = origin.as_str();

    let mut findings = Vec::new();
    for header in REQUIRED_HEADERS {
        if header.https_only && !https {
            continue;
        }
        if response.header(header.name).is_some() {
            continue;
        }
        findings.push(
            Detection::new(Category::SecurityHeaders, location)
                .severity(header.severity)
                .title(format!("Missing {} header", header.name))
                .parameter(header.name)
                .evidence(format!(
                    "Response from {} has no {} header; it {}",
                    response.url, header.name, header.purpose
                ))
                .into_finding(),
        );
    }

    for banner in ["server", "x-powered-by"] {
        let Some(value) = response.header(banner) else {
            continue;
        };
        if !discloses_version(value) {
            continue;
        }
        findings.push(
            Detection::new(Category::InfoDisclosure, location)
                .severity(Severity::Low)
                .title(format!("Version disclosed in {} header", banner))
                .parameter(banner)
                .evidence(format!("{}: {}", banner, value))
                .into_finding(),
        );
    }

    findings
}

pub struct HeadersModule {
    probe: Arc<HttpProbe>,
}

impl HeadersModule {
    pub fn new(probe: Arc<HttpProbe>) -> Self {
        Self { probe }
    }

    async fn test_location(&self, location: &str, ctx: &TestContext) -> Result<Vec<Finding>> {
        let Ok(url) = Url::parse(location) else {
            return Ok(Vec::new());
        };
        let response = self.probe.get(&url, ctx).await?;
        Ok(audit(&response))
    }
}

#[async_trait]
impl TestModule for HeadersModule {
    fn kind(&self) -> TestCategory {
        TestCategory::Headers
    }

    async fn test(
        &self,
        locations: &[String],
        _payloads: &[String],
        ctx: &TestContext,
    ) -> Result<Vec<Finding>> {
        let (locations, _) = sampling::sample(locations, &[], ctx.mode, ctx.seed, self.kind());

        let outcomes = map_bounded(
            locations,
            move |location| async move { self.test_location(&location, ctx).await },
            ctx.concurrency,
        )
        .await;

        collect(self.kind(), outcomes)
    }
}
