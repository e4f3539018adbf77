//! Catalog server client
//!
//! Listing pages, the live channel list, stream command resolution and the
//! reachability probe used by the retry policy. All endpoints live under one
//! base URL:
//!
//! - `GET  /api/catalog?type=&page=&search=&category=&movie_id=&season_id=&episode_id=`
//! - `GET  /api/channels`
//! - `GET  /api/stream?cmd=<reference>`
//! - `HEAD <stream url>` (probe)

use serde::Deserialize;
use thiserror::Error;

use crate::config::DEFAULT_SERVER;
use crate::models::{CatalogPage, CatalogParams, MediaItem};
use crate::pagination::FetchError;
use crate::retry::ProbeOutcome;
use crate::session::ResolutionError;

/// Failure talking to the catalog server
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CatalogError {
    /// Tag the failure with the page it was for
    pub fn into_fetch_error(self, page: usize) -> FetchError {
        FetchError::new(page, self.to_string())
    }
}

impl From<CatalogError> for ResolutionError {
    fn from(e: CatalogError) -> Self {
        ResolutionError::Failed(e.to_string())
    }
}

/// `/api/stream` response
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    cmd: Option<String>,
}

/// Channel list is either a bare array or wrapped like a catalog page
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChannelsResponse {
    Bare(Vec<MediaItem>),
    Page(CatalogPage),
}

/// Catalog server client
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    client: reqwest::Client,
}

impl CatalogClient {
    /// Client for the default local server
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_SERVER)
    }

    /// Client with a custom base URL (config, env, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One listing page, or the file set of a movie / episode
    pub async fn fetch(&self, params: &CatalogParams) -> Result<CatalogPage, CatalogError> {
        let url = format!("{}/api/catalog", self.base_url);
        tracing::debug!(%url, page = params.page, "catalog request");
        let response = self
            .client
            .get(&url)
            .query(&params.query_pairs())
            .send()
            .await?;
        let text = Self::body(response).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Complete live channel list
    pub async fn channels(&self) -> Result<Vec<MediaItem>, CatalogError> {
        let url = format!("{}/api/channels", self.base_url);
        let response = self.client.get(&url).send().await?;
        let text = Self::body(response).await?;
        Ok(match serde_json::from_str(&text)? {
            ChannelsResponse::Bare(items) => items,
            ChannelsResponse::Page(page) => page.items,
        })
    }

    /// Resolve a file or channel reference into its stream command. The
    /// server may answer without a command, which is not an error here.
    pub async fn resolve(&self, reference: &str) -> Result<Option<String>, CatalogError> {
        let url = format!(
            "{}/api/stream?cmd={}",
            self.base_url,
            urlencoding::encode(reference)
        );
        let response = self.client.get(&url).send().await?;
        let text = Self::body(response).await?;
        let data: StreamResponse = serde_json::from_str(&text)?;
        Ok(data.cmd.filter(|c| !c.trim().is_empty()))
    }

    /// Reachability check of a stream URL. Any HTTP answer is a status;
    /// only transport failures count as unreachable.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.head(url).send().await {
            Ok(response) => ProbeOutcome::Status(response.status().as_u16()),
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }

    async fn body(response: reqwest::Response) -> Result<String, CatalogError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}
