//! File upload forms that do not restrict file types

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::collect;
use crate::engine::page::{self, FormField};
use crate::engine::parallel::map_bounded;
use crate::engine::{Detection, HttpProbe, TestContext, TestModule, sampling};
use crate::error::Result;
use crate::models::{Category, Finding, Severity, TestCategory};

/// Accept tokens that still let server-side executable or active content through
const PERMISSIVE_ACCEPT: &[&str] = &[
    "*", ".php", ".phtml", ".jsp", ".asp", ".aspx", ".exe", ".sh", ".html", ".htm", ".svg",
    "text/html", "image/svg+xml", "application/x-php", "application/octet-stream",
];

/// Severity of an upload field, `None` when its `accept` is restrictive
fn assess(field: &FormField) -> Option<Severity> {
    let accept = match field.accept.as_deref().map(str::trim) {
        None | Some("") => return Some(Severity::High),
        Some(accept) => accept.to_ascii_lowercase(),
    };

    let permissive = accept
        .split(',')
        .map(str::trim)
        .any(|token| token.ends_with("/*") || PERMISSIVE_ACCEPT.contains(&token));

    permissive.then_some(Severity::Medium)
}

fn findings_for(base: &Url, body: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for form in page::forms(base, body) {
        for field in form.file_fields() {
            let Some(severity) = assess(field) else {
                continue;
            };
            let restriction = match &field.accept {
                Some(accept) => format!("accept=\"{}\"", accept),
                None => "no accept restriction".to_string(),
            };
            findings.push(
                Detection::new(Category::FileUpload, form.action.as_str())
                    .severity(severity)
                    .parameter(field.name.clone())
                    .evidence(format!(
                        "<input type=\"file\" name=\"{}\"> in {} has {}",
                        field.name, form.markup, restriction
                    ))
                    .into_finding(),
            );
        }
    }
    findings
}

pub struct UploadModule {
    probe: Arc<HttpProbe>,
}

impl UploadModule {
    pub fn new(probe: Arc<HttpProbe>) -> Self {
        Self { probe }
    }

    async fn test_location(&self, location: &str, ctx: &TestContext) -> Result<Vec<Finding>> {
        let Ok(url) = Url::parse(location) else {
            return Ok(Vec::new());
        };
        let response = self.probe.get(&url, ctx).await?;
        if !response.is_html() {
            return Ok(Vec::new());
        }
        Ok(findings_for(&response.url, &response.body))
    }
}

#[async_trait]
impl TestModule for UploadModule {
    fn kind(&self) -> TestCategory {
        TestCategory::Upload
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe::testing::{context, probe};
    use crate::models::ScanMode;

    fn field(accept: Option<&str>) -> FormField {
        FormField {
            name: "file".to_string(),
            kind: "file".to_string(),
            accept: accept.map(str::to_string),
        }
    }

    #[test]
    fn test_assess() {
        assert_eq!(assess(&field(None)), Some(Severity::High));
        assert_eq!(assess(&field(Some(" "))), Some(Severity::High));
        assert_eq!(assess(&field(Some("image/*"))), Some(Severity::Medium));
        assert_eq!(assess(&field(Some(".png, .SVG"))), Some(Severity::Medium));
        assert_eq!(assess(&field(Some("image/png,image/jpeg"))), None);
    }

    #[tokio::test]
    async fn test_module_flags_open_upload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/upload")
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(
                r#"<form method="post" enctype="multipart/form-data" action="/upload">
                     <input type="file" name="document">
                   </form>
                   <form method="post" action="/avatar">
                     <input type="file" name="avatar" accept="image/png">
                   </form>"#,
            )
            .create_async()
            .await;

        let module = UploadModule::new(probe());
        let findings = module
            .test(
                &[format!("{}/upload", server.url())],
                &[],
                &context(ScanMode::Thorough),
            )
            .await
            .unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::FileUpload);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].parameter.as_deref(), Some("document"));
        assert!(findings[0].location.ends_with("/upload"));
    }
}
