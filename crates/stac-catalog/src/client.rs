//! HTTP client for the STAC API item search.

use std::time::Duration;

use ecohub_common::{EcohubError, EcohubResult};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::model::{ItemCollection, Link, StacItem};
use crate::search::SearchRequest;

/// Client settings.
#[derive(Debug, Clone)]
pub struct StacClientConfig {
    /// Root of the STAC API, e.g. `https://planetarycomputer.microsoft.com/api/stac/v1`.
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Items requested per page.
    pub page_size: u32,
    /// Pages followed before the search fails rather than return a
    /// truncated result.
    pub max_pages: usize,
}

impl Default for StacClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::PLANETARY_COMPUTER_STAC_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            page_size: 100,
            max_pages: 50,
        }
    }
}

/// STAC API client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct StacClient {
    http: Client,
    config: StacClientConfig,
}

enum PageCursor {
    First(Value),
    Next { link: Link, previous_body: Value },
    Done,
}

impl StacClient {
    pub fn new(config: StacClientConfig) -> EcohubResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| EcohubError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_http_client(http, config))
    }

    pub fn with_http_client(http: Client, config: StacClientConfig) -> Self {
        Self { http, config }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn config(&self) -> &StacClientConfig {
        &self.config
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }

    /// Lazily page through search results, following `rel="next"` links.
    ///
    /// Nothing is requested until the stream is polled. Dropping the stream
    /// stops paging; re-running the search starts again from page one.
    /// A `next` link still pending after `max_pages` pages yields
    /// `CatalogUnavailable`.
    pub fn search(
        &self,
        request: SearchRequest,
    ) -> impl Stream<Item = EcohubResult<StacItem>> + Send + 'static {
        self.search_pages(request)
            .map_ok(|page| stream::iter(page.features.into_iter().map(Ok)))
            .try_flatten()
    }

    /// Like [`StacClient::search`], yielding whole pages.
    pub fn search_pages(
        &self,
        request: SearchRequest,
    ) -> impl Stream<Item = EcohubResult<ItemCollection>> + Send + 'static {
        let client = self.clone();
        let mut body = request;
        if body.limit.is_none() {
            body.limit = Some(self.config.page_size);
        }
        let first = PageCursor::First(body.to_json());

        stream::try_unfold((first, 0usize), move |(cursor, fetched)| {
            let client = client.clone();
            async move {
                if fetched >= client.config.max_pages && !matches!(cursor, PageCursor::Done) {
                    let max_pages = client.config.max_pages;
                    warn!(max_pages, "Search still has results after the page limit");
                    return Err(EcohubError::CatalogUnavailable(format!(
                        "Search returned more than {} pages of results",
                        max_pages
                    )));
                }

                let (page, body) = match cursor {
                    PageCursor::Done => return Ok(None),
                    PageCursor::First(body) => {
                        let url = client.search_url();
                        (client.post_page(&url, &body).await?, body)
                    }
                    PageCursor::Next {
                        link,
                        previous_body,
                    } => {
                        if link.is_post() {
                            let body = next_body(&previous_body, &link);
                            (client.post_page(&link.href, &body).await?, body)
                        } else {
                            (client.get_page(&link.href).await?, previous_body)
                        }
                    }
                };

                let next = match page.next_link() {
                    Some(link) => PageCursor::Next {
                        link: link.clone(),
                        previous_body: body,
                    },
                    None => PageCursor::Done,
                };
                Ok(Some((page, (next, fetched + 1))))
            }
        })
        .boxed()
    }

    #[instrument(skip(self, body))]
    async fn post_page(&self, url: &str, body: &Value) -> EcohubResult<ItemCollection> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_page(response).await
    }

    #[instrument(skip(self))]
    async fn get_page(&self, url: &str) -> EcohubResult<ItemCollection> {
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        read_page(response).await
    }
}

async fn read_page(response: reqwest::Response) -> EcohubResult<ItemCollection> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(map_status(status, &body));
    }
    let page: ItemCollection = response
        .json()
        .await
        .map_err(|e| EcohubError::CatalogUnavailable(format!("Malformed search response: {}", e)))?;
    debug!(items = page.features.len(), has_next = page.next_link().is_some(), "Fetched search page");
    Ok(page)
}

/// Body for a POST `next` link: the link body merged over the previous
/// request when `merge` is set, otherwise the link body alone.
fn next_body(previous: &Value, link: &Link) -> Value {
    match (&link.body, link.merge) {
        (Some(Value::Object(extra)), true) => {
            let mut merged = previous.clone();
            if let Value::Object(map) = &mut merged {
                for (k, v) in extra {
                    map.insert(k.clone(), v.clone());
                }
            }
            merged
        }
        (Some(body), _) => body.clone(),
        (None, _) => previous.clone(),
    }
}

/// Map transport failures: timeouts are transient, the rest means the
/// catalog cannot be used right now.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> EcohubError {
    if err.is_timeout() {
        EcohubError::TransientIo(format!("Catalog request timed out: {}", err))
    } else {
        EcohubError::CatalogUnavailable(format!("Catalog request failed: {}", err))
    }
}

pub(crate) fn map_status(status: StatusCode, body: &str) -> EcohubError {
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS | StatusCode::GATEWAY_TIMEOUT => {
            EcohubError::TransientIo(format!("Catalog returned {}: {}", status, snippet))
        }
        _ => EcohubError::CatalogUnavailable(format!("Catalog returned {}: {}", status, snippet)),
    }
}
