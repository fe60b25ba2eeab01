use std::future::Future;

use chrono::Utc;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::filter::UrlFilter;
use crate::query::QueryRequest;

/// Header carrying the opaque pagination cursor in both directions.
pub const SEARCH_AFTER_HEADER: &str = "CMR-Search-After";

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub urls: Vec<String>,
    /// Cursor for the following page; `None` ends pagination.
    pub next: Option<String>,
}

/// Granule search backend.
///
/// # Implementations
///
/// - [`CmrCatalog`]: CMR `granules.umm_json` search
/// - Mock implementations for testing
pub trait Catalog: Send + Sync {
    fn page(
        &self,
        request: &QueryRequest,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<CatalogPage>> + Send;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Granule>,
}

#[derive(Deserialize)]
struct Granule {
    umm: Option<Umm>,
}

#[derive(Deserialize)]
struct Umm {
    #[serde(rename = "RelatedUrls", default)]
    related_urls: Vec<RelatedUrl>,
}

#[derive(Deserialize)]
struct RelatedUrl {
    #[serde(rename = "URL")]
    url: Option<String>,
}

/// Decode a `granules.umm_json` body.
///
/// A page whose first item carries no `umm` block is treated as the end of
/// the result set.
fn parse_page(body: &str, next: Option<String>) -> Result<CatalogPage> {
    let response: SearchResponse = serde_json::from_str(body)?;
    if !response.items.first().is_some_and(|item| item.umm.is_some()) {
        return Ok(CatalogPage::default());
    }
    let urls = response
        .items
        .into_iter()
        .filter_map(|item| item.umm)
        .flat_map(|umm| umm.related_urls)
        .filter_map(|related| related.url)
        .collect();
    Ok(CatalogPage { urls, next })
}

/// CMR granule search over HTTPS.
pub struct CmrCatalog {
    http:  reqwest::Client,
    url:   String,
    token: Option<String>,
}

impl CmrCatalog {
    pub fn new(http: reqwest::Client, host: &str) -> Self {
        Self {
            http,
            url: format!("https://{}/search/granules.umm_json", host.trim_end_matches('/')),
            token: None,
        }
    }

    /// Override the full search URL, e.g. to point at a local mirror.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl Catalog for CmrCatalog {
    async fn page(&self, request: &QueryRequest, cursor: Option<&str>) -> Result<CatalogPage> {
        let mut params = request.params(Utc::now())?;
        if let Some(token) = &self.token {
            params.push(("token", token.clone()));
        }

        let mut builder = self.http.get(&self.url).query(&params);
        if let Some(cursor) = cursor {
            builder = builder.header(SEARCH_AFTER_HEADER, cursor);
        }

        let response = builder.send().await?;
        let status = response.status();
        let next = response
            .headers()
            .get(SEARCH_AFTER_HEADER)
            .and_then(|value: &HeaderValue| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_page(&body, next)
    }
}

/// Follow the cursor to the last page, then apply `filter`.
///
/// A URL listed several times is kept once, in first-seen order.
pub async fn query_all<C: Catalog + ?Sized>(
    catalog: &C,
    request: &QueryRequest,
    filter: &UrlFilter,
) -> Result<Vec<String>> {
    info!(provider = %request.provider, collection = %request.collection, "querying catalog");

    let mut found = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = catalog.page(request, cursor.as_deref()).await?;
        pages += 1;
        debug!(page = pages, urls = page.urls.len(), "catalog page received");
        found.extend(page.urls);

        match page.next {
            Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                warn!(cursor = %next, "catalog repeated its cursor, stopping pagination");
                break;
            }
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    let mut seen = std::collections::HashSet::new();
    let urls: Vec<String> = found
        .into_iter()
        .filter(|url| filter.accepts(url))
        .filter(|url| seen.insert(url.clone()))
        .collect();

    info!(pages, files = urls.len(), "found {} total files", urls.len());
    Ok(urls)
}
