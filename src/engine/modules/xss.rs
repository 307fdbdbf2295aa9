//! Reflected XSS: a payload echoed verbatim into the response

use std::sync::Arc;

use async_trait::async_trait;

use super::collect;
use crate::engine::parallel::map_bounded;
use crate::engine::{
    Detection, HttpProbe, TestContext, TestModule, excerpt, inject, injectable_parameters,
    sampling,
};
use crate::error::Result;
use crate::models::{Category, Finding, Severity, TestCategory};

pub struct XssModule {
    probe: Arc<HttpProbe>,
}

impl XssModule {
    pub fn new(probe: Arc<HttpProbe>) -> Self {
        Self { probe }
    }

    /// First reflecting payload per parameter of one location
    async fn test_location(
        &self,
        location: &str,
        payloads: &[String],
        ctx: &TestContext,
    ) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut probed = 0usize;

        for parameter in injectable_parameters(location) {
            for payload in payloads {
                let Some(url) = inject(location, &parameter, payload) else {
                    continue;
                };
                let response = self.probe.get(&url, ctx).await?;
                probed += 1;

                if !response.body.contains(payload.as_str()) {
                    continue;
                }

                // Reflection into non-HTML content is not directly executable
                let severity = if response.is_html() {
                    Severity::High
                } else {
                    Severity::Medium
                };

                findings.push(
                    Detection::new(Category::Xss, location)
                        .severity(severity)
                        .parameter(parameter.clone())
                        .payload(payload.clone())
                        .evidence(excerpt(&response.body, payload, 60))
                        .into_finding(),
                );
                break;
            }
        }

        log::debug!("XSS probed {} ({} requests)", location, probed);
        Ok(findings)
    }
}

#[async_trait]
impl TestModule for XssModule {
    fn kind(&self) -> TestCategory {
        TestCategory::Xss
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe::testing::{context, probe};
    use crate::models::ScanMode;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_reflected_payload_detected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("q".into(), "<b>vs</b>".into()))
            .with_header("content-type", "text/html")
            .with_body("<p>Results for <b>vs</b></p>")
            .create_async()
            .await;

        let module = XssModule::new(probe());
        let location = format!("{}/search?q=test", server.url());
        let findings = module
            .test(
                &[location.clone()],
                &["<b>vs</b>".to_string()],
                &context(ScanMode::Thorough),
            )
            .await
            .unwrap();

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.category, Category::Xss);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.parameter.as_deref(), Some("q"));
        assert_eq!(finding.location, location);
        assert!(finding.evidence.contains("<b>vs</b>"));
    }

    #[tokio::test]
    async fn test_encoded_output_is_clean() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_header("content-type", "text/html")
            .with_body("<p>Results for &lt;b&gt;vs&lt;/b&gt;</p>")
            .create_async()
            .await;

        let module = XssModule::new(probe());
        let findings = module
            .test(
                &[format!("{}/search?q=test", server.url())],
                &["<b>vs</b>".to_string()],
                &context(ScanMode::Thorough),
            )
            .await
            .unwrap();

        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_locations_fail_module() {
        let module = XssModule::new(probe());
        let result = module
            .test(
                &["http://127.0.0.1:1/search?q=1".to_string()],
                &["<b>vs</b>".to_string()],
                &context(ScanMode::Thorough),
            )
            .await;
        assert!(result.is_err());
    }
}
