//! Upstream metadata source.
//!
//! The collector only needs "give me the next page of videos for this query";
//! [`YouTubeSource`] implements that on top of the YouTube Data API v3 by
//! pairing a `search.list` call (ids for one page) with a `videos.list` call
//! (details for those ids).

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";

/// Largest page the upstream accepts.
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Worth retrying: timeouts, connection failures, 429 and 5xx.
    #[error("transient upstream failure: {0}")]
    Transient(String),
    #[error("upstream rejected the request: {0}")]
    Permanent(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: String,
    pub published_after: OffsetDateTime,
    pub page_token: Option<String>,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<RawVideo>,
    /// `None` when the source has nothing more.
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, SourceError>;
}

// --- Wire types, as returned by videos.list ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVideo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub snippet: Option<RawSnippet>,
    #[serde(default)]
    pub statistics: Option<RawStatistics>,
    #[serde(default)]
    pub content_details: Option<RawContentDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub channel_title: Option<String>,
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<RawThumbnails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThumbnails {
    pub high: Option<RawThumbnail>,
    pub medium: Option<RawThumbnail>,
    pub default: Option<RawThumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThumbnail {
    pub url: Option<String>,
}

/// Counters arrive as decimal strings, occasionally as numbers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatistics {
    pub view_count: Option<serde_json::Value>,
    pub like_count: Option<serde_json::Value>,
    pub comment_count: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContentDetails {
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<RawVideo>,
}

pub struct YouTubeSource {
    client: Client,
    api_key: String,
    base: Url,
}

impl YouTubeSource {
    pub fn new(api_key: impl Into<String>, api_base: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("trendwatch-collector/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        let mut base = Url::parse(api_base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, api_key: api_key.into(), base })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T, SourceError> {
        let mut url = self
            .base
            .join(endpoint)
            .map_err(|e| SourceError::Permanent(format!("bad endpoint {endpoint}: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("key", &self.api_key);

        let resp = self.client.get(url).send().await.map_err(classify_transport)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(classify_transport)?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let detail = format!("{endpoint} returned {status}: {}", body.chars().take(200).collect::<String>());
            return Err(if is_transient_status(status) {
                SourceError::Transient(detail)
            } else {
                SourceError::Permanent(detail)
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Permanent(format!("{endpoint} returned malformed JSON: {e}")))
    }
}

#[async_trait]
impl MetadataSource for YouTubeSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, SourceError> {
        let published_after = request
            .published_after
            .format(&Rfc3339)
            .map_err(|e| SourceError::Permanent(format!("cannot format publish bound: {e}")))?;
        let mut params = vec![
            ("part", "id".to_string()),
            ("type", "video".to_string()),
            ("videoDuration", "short".to_string()),
            ("order", "viewCount".to_string()),
            ("q", request.query.clone()),
            ("publishedAfter", published_after),
            ("maxResults", request.page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(token) = &request.page_token {
            params.push(("pageToken", token.clone()));
        }
        let search: SearchListResponse = self.get_json("search", &params).await?;

        let ids: Vec<String> = search.items.into_iter().filter_map(|i| i.id.video_id).collect();
        tracing::debug!(ids = ids.len(), next = ?search.next_page_token, "search page");
        if ids.is_empty() {
            return Ok(Page { items: Vec::new(), next_page_token: search.next_page_token });
        }

        let details: VideoListResponse = self
            .get_json(
                "videos",
                &[("part", "snippet,statistics,contentDetails".to_string()), ("id", ids.join(","))],
            )
            .await?;
        Ok(Page { items: details.items, next_page_token: search.next_page_token })
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT || status.is_server_error()
}

fn classify_transport(e: reqwest::Error) -> SourceError {
    if e.is_builder() {
        SourceError::Permanent(e.to_string())
    } else {
        SourceError::Transient(e.to_string())
    }
}
