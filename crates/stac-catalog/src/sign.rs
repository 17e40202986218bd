//! Asset href signing.
//!
//! Planetary Computer assets live in Azure Blob Storage and need a
//! short-lived SAS token appended as a query string. Tokens are fetched per
//! collection, once per discovery call, and never cached across requests.

use async_trait::async_trait;
use ecohub_common::{EcohubError, EcohubResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{map_reqwest_error, map_status};

/// How hrefs of one collection are signed for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HrefSigning {
    /// Hrefs are usable as-is.
    Unsigned,
    /// Append a SAS token as the query string.
    QueryToken(String),
}

impl HrefSigning {
    pub fn apply(&self, href: &str) -> String {
        match self {
            HrefSigning::Unsigned => href.to_string(),
            HrefSigning::QueryToken(token) => {
                // Already-signed hrefs are left as is.
                if href.contains("sig=") {
                    return href.to_string();
                }
                let separator = if href.contains('?') { '&' } else { '?' };
                format!("{}{}{}", href, separator, token.trim_start_matches('?'))
            }
        }
    }
}

/// Trait for catalogs' href signing mechanisms.
#[async_trait]
pub trait HrefSigner: Send + Sync {
    /// Obtain signing material for `collection`.
    async fn signing_for(&self, collection: &str) -> EcohubResult<HrefSigning>;
}

/// Signer for public catalogs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSigner;

#[async_trait]
impl HrefSigner for NoopSigner {
    async fn signing_for(&self, _collection: &str) -> EcohubResult<HrefSigning> {
        Ok(HrefSigning::Unsigned)
    }
}

#[derive(Debug, Deserialize)]
struct SasToken {
    token: String,
}

/// Planetary Computer SAS token signer (`GET {sas_url}/token/{collection}`).
#[derive(Debug, Clone)]
pub struct PlanetaryComputerSigner {
    http: Client,
    sas_url: String,
}

impl PlanetaryComputerSigner {
    pub fn new(http: Client, sas_url: impl Into<String>) -> Self {
        Self {
            http,
            sas_url: sas_url.into(),
        }
    }
}

#[async_trait]
impl HrefSigner for PlanetaryComputerSigner {
    #[instrument(skip(self))]
    async fn signing_for(&self, collection: &str) -> EcohubResult<HrefSigning> {
        let url = format!("{}/token/{}", self.sas_url.trim_end_matches('/'), collection);
        let response = self.http.get(&url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body));
        }

        let sas: SasToken = response
            .json()
            .await
            .map_err(|e| EcohubError::CatalogUnavailable(format!("Malformed SAS token response: {}", e)))?;
        debug!(collection, "Obtained SAS token");
        Ok(HrefSigning::QueryToken(sas.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_token() {
        let signing = HrefSigning::QueryToken("st=2024&se=2025&sig=abc".into());
        assert_eq!(
            signing.apply("https://acct.blob.core.windows.net/c/a.tif"),
            "https://acct.blob.core.windows.net/c/a.tif?st=2024&se=2025&sig=abc"
        );
        assert_eq!(
            signing.apply("https://acct.blob.core.windows.net/c/a.tif?v=1"),
            "https://acct.blob.core.windows.net/c/a.tif?v=1&st=2024&se=2025&sig=abc"
        );
    }

    #[test]
    fn test_signed_href_untouched() {
        let signing = HrefSigning::QueryToken("sig=new".into());
        let href = "https://acct.blob.core.windows.net/c/a.tif?sig=old";
        assert_eq!(signing.apply(href), href);
        assert_eq!(HrefSigning::Unsigned.apply("http://x/a.tif"), "http://x/a.tif");
    }
}
