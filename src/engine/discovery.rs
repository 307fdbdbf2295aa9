//! Breadth-first same-origin crawl

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use url::Url;

use super::{Discovery, HttpProbe, TestContext, page};
use crate::error::{Result, ScanError};
use crate::models::ScanMode;

/// Most pages fetched per crawl, by mode
fn page_cap(mode: ScanMode) -> usize {
    match mode {
        ScanMode::Quick => 10,
        ScanMode::Standard => 40,
        ScanMode::Thorough => 200,
    }
}

pub struct HttpDiscovery {
    probe: Arc<HttpProbe>,
}

impl HttpDiscovery {
    pub fn new(probe: Arc<HttpProbe>) -> Self {
        Self { probe }
    }
}

/// Locations worth testing from one page: followable links and GET forms
/// turned into query URLs.
fn extract(base: &Url, body: &str) -> (Vec<Url>, Vec<Url>) {
    let links = page::links(base, body)
        .into_iter()
        .filter(|u| page::same_origin(base, u))
        .collect();

    let form_targets = page::forms(base, body)
        .into_iter()
        .filter(|f| !f.is_post() && !f.fields.is_empty())
        .filter(|f| page::same_origin(base, &f.action))
        .map(|f| {
            let mut url = f.action.clone();
            {
                let mut query = url.query_pairs_mut();
                for field in f.fields.iter().filter(|field| field.kind != "submit") {
                    query.append_pair(&field.name, "test");
                }
            }
            url
        })
        .collect();

    (links, form_targets)
}

#[async_trait]
impl Discovery for HttpDiscovery {
    async fn discover(&self, target: &Url, depth: u32, ctx: &TestContext) -> Result<Vec<String>> {
        let cap = page_cap(ctx.mode);
        let mut locations: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(Url, u32)> = VecDeque::new();
        let mut fetched = 0usize;
        let mut failures = 0usize;

        seen.insert(target.to_string());
        queue.push_back((target.clone(), 0));

        while let Some((url, level)) = queue.pop_front() {
            if fetched >= cap {
                break;
            }
            locations.push(url.to_string());

            if level >= depth {
                continue;
            }

            fetched += 1;
            let response = match self.probe.get(&url, ctx).await {
                Ok(r) => r,
                Err(e) => {
                    debug!("Crawl skipped {}: {}", url, e);
                    failures += 1;
                    continue;
                }
            };
            if !response.is_html() {
                continue;
            }

            let (links, form_targets) = extract(&response.url, &response.body);
            for next in links.into_iter().chain(form_targets) {
                if seen.insert(next.to_string()) {
                    queue.push_back((next, level + 1));
                }
            }
        }

        if fetched > 0 && failures == fetched {
            return Err(ScanError::Network(format!("no page below {} could be fetched", target)).into());
        }

        debug!(
            "Discovered {} locations under {} ({} pages fetched)",
            locations.len(),
            target,
            fetched
        );
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe::testing::{context, probe};

    #[test]
    fn test_extract_keeps_same_origin_and_get_forms() {
        let base = Url::parse("https://x.test/").unwrap();
        let body = r#"
            <a href="/a">A</a>
            <a href="https://elsewhere.test/">out</a>
            <form action="/find"><input name="term"><input type="submit" name="go"></form>
            <form method="post" action="/login"><input name="user"></form>
        "#;
        let (links, forms) = extract(&base, body);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://x.test/a");
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].as_str(), "https://x.test/find?term=test");
    }

    #[tokio::test]
    async fn test_discover_follows_links_to_depth() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/level1">one</a>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/level1")
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/level2">two</a>"#)
            .create_async()
            .await;
        let deep = server
            .mock("GET", "/level2")
            .with_body("unreached")
            .expect(0)
            .create_async()
            .await;

        let discovery = HttpDiscovery::new(probe());
        let target = Url::parse(&server.url()).unwrap();
        let found = discovery
            .discover(&target, 2, &context(ScanMode::Standard))
            .await
            .unwrap();

        assert_eq!(found.len(), 3);
        assert!(found[0].ends_with('/'));
        assert!(found[1].ends_with("/level1"));
        assert!(found[2].ends_with("/level2"));
        deep.assert_async().await;
    }

    #[tokio::test]
    async fn test_discover_fails_when_nothing_fetchable() {
        let discovery = HttpDiscovery::new(probe());
        let target = Url::parse("http://127.0.0.1:1/").unwrap();
        let result = discovery
            .discover(&target, 1, &context(ScanMode::Quick))
            .await;
        assert!(result.is_err());
    }
}
