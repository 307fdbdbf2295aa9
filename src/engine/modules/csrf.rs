//! CSRF: state-changing forms without an anti-forgery token

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::collect;
use crate::catalog::CSRF_TOKEN_NAMES;
use crate::engine::page::{self, Form};
use crate::engine::parallel::map_bounded;
use crate::engine::{Detection, HttpProbe, TestContext, TestModule, sampling};
use crate::error::Result;
use crate::models::{Category, Finding, Severity, TestCategory};

fn has_token(form: &Form) -> bool {
    form.fields.iter().any(|field| {
        let name = field.name.to_ascii_lowercase();
        CSRF_TOKEN_NAMES.iter().any(|token| name.contains(token))
    })
}

/// Forms that change credentials are worth more to an attacker
fn severity_of(form: &Form) -> Severity {
    if form.fields.iter().any(|f| f.kind == "password") {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn unprotected_forms(base: &Url, body: &str) -> Vec<Form> {
    page::forms(base, body)
        .into_iter()
        .filter(|form| form.is_post() && !has_token(form))
        .collect()
}

pub struct CsrfModule {
    probe: Arc<HttpProbe>,
}

impl CsrfModule {
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

        let findings = unprotected_forms(&response.url, &response.body)
            .into_iter()
            .map(|form| {
                Detection::new(Category::Csrf, form.action.as_str())
                    .severity(severity_of(&form))
                    .evidence(format!("{} contains no anti-CSRF token", form.markup))
                    .into_finding()
            })
            .collect();
        Ok(findings)
    }
}

#[async_trait]
impl TestModule for CsrfModule {
    fn kind(&self) -> TestCategory {
        TestCategory::Csrf
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
