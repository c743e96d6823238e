//! Content provider boundary and the Reddit public JSON listing implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("listing request to {url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("could not parse listing: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    /// Fullname (`t3_…`), the item id used everywhere else.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Subreddit name without the `r/` prefix.
    pub source: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditComment {
    pub id: String,
    pub body: String,
    pub author: String,
    pub score: i64,
    pub created_utc: f64,
}

/// Fetches hot items and their comments from an external source.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn list_hot(&self, source: &str, limit: usize) -> Result<Vec<RedditPost>, ProviderError>;

    async fn list_comments(
        &self,
        permalink: &str,
        limit: usize,
    ) -> Result<Vec<RedditComment>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    name: String,
    title: String,
    #[serde(default)]
    selftext: String,
    subreddit: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    url: String,
    permalink: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl From<RawPost> for RedditPost {
    fn from(raw: RawPost) -> Self {
        let body = decode_html_entities(&raw.selftext);
        Self {
            id: raw.name,
            title: decode_html_entities(&raw.title),
            body: (!body.trim().is_empty()).then_some(body),
            source: raw.subreddit,
            author: raw.author,
            score: raw.score,
            num_comments: raw.num_comments,
            url: raw.url,
            permalink: raw.permalink,
            created_utc: raw.created_utc,
            thumbnail: raw
                .thumbnail
                .filter(|t| t.starts_with("http")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    body: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
}

impl From<RawComment> for RedditComment {
    fn from(raw: RawComment) -> Self {
        Self {
            id: raw.id,
            body: decode_html_entities(&raw.body),
            author: raw.author,
            score: raw.score,
            created_utc: raw.created_utc,
        }
    }
}

/// Reddit public JSON API client.
#[derive(Clone)]
pub struct RedditClient {
    client: Client,
    base_url: String,
}

impl RedditClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ContentProvider for RedditClient {
    async fn list_hot(&self, source: &str, limit: usize) -> Result<Vec<RedditPost>, ProviderError> {
        let url = format!("{}/r/{}/hot.json?limit={}", self.base_url, source, limit);
        let body = self.get_json(&url).await?;
        let posts = parse_post_listing(body)?;
        debug!("Fetched {} hot posts from r/{}", posts.len(), source);
        Ok(posts)
    }

    async fn list_comments(
        &self,
        permalink: &str,
        limit: usize,
    ) -> Result<Vec<RedditComment>, ProviderError> {
        let url = format!(
            "{}{}.json?limit={}&depth=2",
            self.base_url,
            permalink.trim_end_matches('/'),
            limit
        );
        let body = self.get_json(&url).await?;
        let mut comments = parse_comment_listing(body)?;
        comments.truncate(limit);
        Ok(comments)
    }
}

/// Posts from a `/r/<source>/hot.json` listing. Non-post children are ignored.
pub fn parse_post_listing(body: Value) -> Result<Vec<RedditPost>, ProviderError> {
    let listing: Listing = serde_json::from_value(body)?;
    listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t3")
        .map(|thing| Ok(serde_json::from_value::<RawPost>(thing.data)?.into()))
        .collect()
}

/// Top-level comments from a permalink listing (`[post, comments]`).
/// "more" stubs and a missing second listing yield nothing.
pub fn parse_comment_listing(body: Value) -> Result<Vec<RedditComment>, ProviderError> {
    let Some(second) = body.as_array().and_then(|parts| parts.get(1)).cloned() else {
        return Ok(Vec::new());
    };
    let listing: Listing = serde_json::from_value(second)?;
    listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t1")
        .map(|thing| Ok(serde_json::from_value::<RawComment>(thing.data)?.into()))
        .collect()
}

/// Decodes the handful of entities Reddit escapes in titles and bodies.
/// Unknown entities are left as written.
pub fn decode_html_entities(text: &str) -> String {
    const ENTITIES: [(&str, &str); 6] = [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&nbsp;", " "),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, decoded)) => {
                out.push_str(decoded);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
