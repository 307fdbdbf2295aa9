//! Error-based SQL injection

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::collect;
use crate::catalog::SQL_ERROR_SIGNATURES;
use crate::engine::parallel::map_bounded;
use crate::engine::{
    Detection, HttpProbe, TestContext, TestModule, excerpt, inject, injectable_parameters,
    sampling,
};
use crate::error::Result;
use crate::models::{Category, Finding, Severity, TestCategory};

/// First database error signature in a lowercased body
fn signature_in(body_lower: &str) -> Option<&'static str> {
    SQL_ERROR_SIGNATURES
        .iter()
        .copied()
        .find(|sig| body_lower.contains(sig))
}

pub struct SqliModule {
    probe: Arc<HttpProbe>,
}

impl SqliModule {
    pub fn new(probe: Arc<HttpProbe>) -> Self {
        Self { probe }
    }

    async fn test_location(
        &self,
        location: &str,
        payloads: &[String],
        ctx: &TestContext,
    ) -> Result<Vec<Finding>> {
        let Ok(base) = Url::parse(location) else {
            return Ok(Vec::new());
        };

        // Pages that always show a database error prove nothing
        let baseline = self.probe.get(&base, ctx).await?;
        let baseline_lower = baseline.body.to_lowercase();

        let mut findings = Vec::new();
        for parameter in injectable_parameters(location) {
            for payload in payloads {
                let Some(url) = inject(location, &parameter, payload) else {
                    continue;
                };
                let response = self.probe.get(&url, ctx).await?;
                let lower = response.body.to_lowercase();

                let Some(signature) = signature_in(&lower) else {
                    continue;
                };
                if baseline_lower.contains(signature) {
                    continue;
                }

                // Lowercasing preserves byte offsets for ASCII signatures only
                let evidence = match lower.find(signature) {
                    Some(pos) if response.body.is_char_boundary(pos) => {
                        let end = (pos + signature.len()).min(response.body.len());
                        if response.body.is_char_boundary(end) {
                            excerpt(&response.body, &response.body[pos..end], 80)
                        } else {
                            signature.to_string()
                        }
                    }
                    _ => signature.to_string(),
                };

                findings.push(
                    Detection::new(Category::SqlInjection, location)
                        .severity(Severity::Critical)
                        .parameter(parameter.clone())
                        .payload(payload.clone())
                        .evidence(evidence)
                        .into_finding(),
                );
                break;
            }
        }
        Ok(findings)
    }
}

#[async_trait]
impl TestModule for SqliModule {
    fn kind(&self) -> TestCategory {
        TestCategory::Sqli
    }

    async fn test(
        &self,
        locations: &[String],
        payloads: &[String],
        ctx: &TestContext,
    ) -> Result<Vec<Finding>> {
        let (locations, payloads) =
            sampling::sample(locations, payloads, ctx.mode, ctx.seed, self.kind());
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let payloads = &payloads;
        let outcomes = map_bounded(
            locations,
            move |location| async move { self.test_location(&location, payloads, ctx).await },
            ctx.concurrency,
        )
        .await;

        collect(self.kind(), outcomes)
    }
}
