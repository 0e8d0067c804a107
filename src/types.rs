use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One configured origin to crawl. Loaded once per run from the source list
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
    /// Default category bucket for items from this source.
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A known feed URL, fetched and parsed directly.
    Rss,
    /// An HTML page; a feed URL is discovered from it first.
    Web,
}

/// Advisory priority carried from the source onto its items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// One candidate piece of content. Items are immutable value records: every
/// pipeline stage consumes a collection and produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    /// Canonical link for the story; unique within a run's output.
    pub url: String,
    /// Plain-text body snippet, length-capped during normalization.
    pub excerpt: String,
    /// Name of the originating source.
    pub source: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Tri-state: unset before classification; `Some(false)` means the item
    /// is dropped once classification has run.
    #[serde(default)]
    pub include: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Decision returned by the classifier for one item. Not persisted; folded
/// into the item's fields immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub include: bool,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DigestMeta {
    pub title: String,
    pub date: NaiveDate,
    pub week: u32,
    pub year: i32,
    pub synopsis: String,
}

/// The final output of a run: metadata plus an ordered mapping from category
/// name to the items surfaced under it. Keyed by (year, week).
#[derive(Debug, Clone)]
pub struct Digest {
    pub meta: DigestMeta,
    pub sections: Vec<(String, Vec<Item>)>,
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed for {url} after {attempts} attempts: {reason}")]
    Fetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("model adapter error: {0}")]
    Adapter(String),

    #[error("model response decode error: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("digest validation failed: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DigestError>;
