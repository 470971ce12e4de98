use std::collections::HashMap;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("no Wikipedia articles for {0} were found")]
    NoMatch(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status {0}")]
    Status(reqwest::StatusCode),

    #[error("page {0} is missing from the response")]
    MissingPage(u64),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ArticleMatch {
    pub title: String,
    pub pageid: u64,
}

/// Encyclopedia lookups used by the summary and launch actions.
pub trait ArticleService {
    /// Best match for `query`; `ArticleError::NoMatch` when the search is empty.
    fn search(&self, query: &str) -> impl Future<Output = Result<ArticleMatch, ArticleError>>;
    /// Plain-text introduction of a page.
    fn extract(&self, page_id: u64) -> impl Future<Output = Result<String, ArticleError>>;
    /// Canonical URL of a page.
    fn link(&self, page_id: u64) -> impl Future<Output = Result<String, ArticleError>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<ArticleMatch>,
}

#[derive(Debug, Deserialize)]
struct PagesResponse {
    query: PagesQuery,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    pages: HashMap<String, PageEntry>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
}

/// MediaWiki action API client.
#[derive(Clone, Debug)]
pub struct WikipediaClient {
    http: reqwest::Client,
    endpoint: String,
}

impl WikipediaClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ArticleError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("wikigraph/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(WikipediaClient { http, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T, ArticleError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ArticleError::Status(response.status()));
        }
        Ok(response.json::<T>().await?)
    }

    async fn page(&self, page_id: u64, params: &[(&str, String)]) -> Result<PageEntry, ArticleError> {
        let mut all = params.to_vec();
        all.push(("pageids", page_id.to_string()));
        let mut body: PagesResponse = self.query(&all).await?;
        body.query
            .pages
            .remove(&page_id.to_string())
            .ok_or(ArticleError::MissingPage(page_id))
    }
}

impl ArticleService for WikipediaClient {
    async fn search(&self, query: &str) -> Result<ArticleMatch, ArticleError> {
        let body: SearchResponse = self
            .query(&[("list", "search".to_string()), ("srsearch", query.to_string())])
            .await?;
        body.query
            .search
            .into_iter()
            .next()
            .ok_or_else(|| ArticleError::NoMatch(query.to_string()))
    }

    async fn extract(&self, page_id: u64) -> Result<String, ArticleError> {
        let entry = self
            .page(
                page_id,
                &[
                    ("prop", "extracts".to_string()),
                    ("exintro", String::new()),
                    ("explaintext", String::new()),
                ],
            )
            .await?;
        entry.extract.ok_or(ArticleError::MissingPage(page_id))
    }

    async fn link(&self, page_id: u64) -> Result<String, ArticleError> {
        let entry = self
            .page(page_id, &[("prop", "info".to_string()), ("inprop", "url".to_string())])
            .await?;
        entry.fullurl.ok_or(ArticleError::MissingPage(page_id))
    }
}
