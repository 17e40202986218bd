//! Asset retrieval.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ecohub_common::{EcohubError, EcohubResult};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

/// Fetches raster assets by href.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Full body of the asset at `href`.
    async fn fetch(&self, href: &str) -> EcohubResult<Bytes>;
}

/// Plain HTTP(S) GET, for signed blob URLs and public assets.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(request_timeout: Duration) -> EcohubResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| EcohubError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    #[instrument(skip_all, fields(href = %redact(href)))]
    async fn fetch(&self, href: &str) -> EcohubResult<Bytes> {
        let response = self
            .client
            .get(href)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status, href));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        debug!(bytes = body.len(), "Fetched asset");
        Ok(body)
    }
}

fn map_status(status: StatusCode, href: &str) -> EcohubError {
    let message = format!("Asset {} returned HTTP {}", redact(href), status);
    match status {
        StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS
        | StatusCode::GATEWAY_TIMEOUT => EcohubError::TransientIo(message),
        _ => EcohubError::CatalogUnavailable(message),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> EcohubError {
    if err.is_timeout() {
        EcohubError::TransientIo(format!("Asset request timed out: {}", err.without_url()))
    } else {
        EcohubError::CatalogUnavailable(format!("Asset request failed: {}", err.without_url()))
    }
}

/// Strip the query string so SAS tokens never reach logs or error bodies.
pub(crate) fn redact(href: &str) -> &str {
    href.split_once('?').map_or(href, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_drops_query() {
        assert_eq!(
            redact("https://acct.blob.core.windows.net/c/2016.tif?se=2030&sig=abc"),
            "https://acct.blob.core.windows.net/c/2016.tif"
        );
        assert_eq!(redact("http://host/a.tif"), "http://host/a.tif");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "http://h/a?sig=x"),
            EcohubError::CatalogUnavailable(ref m) if !m.contains("sig=")
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, "http://h/a"),
            EcohubError::CatalogUnavailable(_)
        ));
        assert!(matches!(
            map_status(StatusCode::GATEWAY_TIMEOUT, "http://h/a"),
            EcohubError::TransientIo(_)
        ));
    }
}
