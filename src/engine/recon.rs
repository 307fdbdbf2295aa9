//! HTTP reconnaissance: reachability, server fingerprint, transport security

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use url::Url;

use super::{HttpProbe, Recon, TestContext};
use crate::error::{Error, Result, ScanError};
use crate::models::{CertificateInfo, ServerInfo};

pub struct HttpRecon {
    probe: Arc<HttpProbe>,
}

impl HttpRecon {
    pub fn new(probe: Arc<HttpProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl Recon for HttpRecon {
    async fn reach(&self, target: &Url, ctx: &TestContext) -> Result<()> {
        // Any HTTP answer, error pages included, proves the host is up
        match self.probe.get(target, ctx).await {
            Ok(response) => {
                debug!("{} reachable (HTTP {})", target, response.status);
                Ok(())
            }
            Err(Error::Scan(ScanError::Network(msg))) => {
                Err(ScanError::TargetUnreachable(format!("{}: {}", target, msg)).into())
            }
            Err(e) => Err(e),
        }
    }

    async fn server_info(&self, target: &Url, ctx: &TestContext) -> Result<ServerInfo> {
        let response = self.probe.get(target, ctx).await?;
        Ok(ServerInfo {
            status_code: response.status,
            server: response.header("server").map(str::to_string),
            powered_by: response.header("x-powered-by").map(str::to_string),
            content_type: response.header("content-type").map(str::to_string),
            response_time_ms: response.elapsed.as_millis() as u64,
        })
    }

    async fn certificate(
        &self,
        target: &Url,
        ctx: &TestContext,
    ) -> Result<Option<CertificateInfo>> {
        if target.scheme() != "https" {
            return Ok(None);
        }

        let response = self.probe.get(target, ctx).await?;
        Ok(Some(CertificateInfo {
            https: true,
            verified: self.probe.verifies_certificates(),
            hsts: response
                .header("strict-transport-security")
                .map(str::to_string),
            issuer: None,
            expires_at: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe::testing::{context, probe};
    use crate::models::ScanMode;

    #[tokio::test]
    async fn test_reach_accepts_error_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/").with_status(503).create_async().await;

        let recon = HttpRecon::new(probe());
        let url = Url::parse(&server.url()).unwrap();
        assert!(recon.reach(&url, &context(ScanMode::Quick)).await.is_ok());
    }

    #[tokio::test]
    async fn test_reach_unreachable() {
        let recon = HttpRecon::new(probe());
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let err = recon
            .reach(&url, &context(ScanMode::Quick))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Scan(ScanError::TargetUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_server_info_fingerprint() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_header("server", "Apache/2.4.57")
            .with_header("x-powered-by", "PHP/8.1.2")
            .with_header("content-type", "text/html")
            .create_async()
            .await;

        let recon = HttpRecon::new(probe());
        let url = Url::parse(&server.url()).unwrap();
        let info = recon
            .server_info(&url, &context(ScanMode::Quick))
            .await
            .unwrap();

        assert_eq!(info.status_code, 200);
        assert_eq!(info.server.as_deref(), Some("Apache/2.4.57"));
        assert_eq!(info.powered_by.as_deref(), Some("PHP/8.1.2"));
    }

    #[tokio::test]
    async fn test_certificate_skipped_for_plain_http() {
        let recon = HttpRecon::new(probe());
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let cert = recon
            .certificate(&url, &context(ScanMode::Quick))
            .await
            .unwrap();
        assert!(cert.is_none());
    }
}
