//! Evidence capture by saving response snapshots to disk

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::{HttpProbe, Screenshotter, TestContext};
use crate::error::{Error, Result};
use crate::models::Finding;

/// Saves the HTML of each finding's location as its evidence reference.
///
/// Snapshots live under `<dir>/<session id>/<finding id>.html`.
pub struct SnapshotCapture {
    probe: Arc<HttpProbe>,
    dir: PathBuf,
}

impl SnapshotCapture {
    pub fn new(probe: Arc<HttpProbe>, dir: PathBuf) -> Self {
        Self { probe, dir }
    }
}

#[async_trait]
impl Screenshotter for SnapshotCapture {
    async fn capture(&self, finding: &Finding, ctx: &TestContext) -> Result<String> {
        let url = Url::parse(&finding.location)
            .map_err(|e| Error::Other(format!("cannot capture '{}': {}", finding.location, e)))?;
        let response = self.probe.get(&url, ctx).await?;

        let dir = self.dir.join(&ctx.session_id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.html", finding.id));
        tokio::fs::write(&path, response.body.as_bytes()).await?;

        Ok(path.display().to_string())
    }

    async fn record(&self, _target: &Url, _ctx: &TestContext) -> Result<String> {
        Err(Error::Other(
            "session recording requires a browser and is not available for HTTP scans"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe::testing::{context, probe};
    use crate::fixtures::FindingBuilder;
    use crate::models::{Category, ScanMode};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_capture_writes_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/account")
            .with_body("<form method=post></form>")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let capture = SnapshotCapture::new(probe(), dir.path().to_path_buf());
        let finding = FindingBuilder::new(Category::Csrf)
            .location(format!("{}/account", server.url()))
            .build();

        let reference = capture
            .capture(&finding, &context(ScanMode::Quick))
            .await
            .unwrap();

        assert!(reference.ends_with(&format!("{}.html", finding.id)));
        let saved = std::fs::read_to_string(&reference).unwrap();
        assert!(saved.contains("<form"));
    }

    #[tokio::test]
    async fn test_record_unsupported() {
        let dir = TempDir::new().unwrap();
        let capture = SnapshotCapture::new(probe(), dir.path().to_path_buf());
        let target = Url::parse("https://example.com").unwrap();
        assert!(capture.record(&target, &context(ScanMode::Quick)).await.is_err());
    }
}
