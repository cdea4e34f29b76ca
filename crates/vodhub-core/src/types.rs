//! Core data types for the vodhub search aggregator
//!
//! Contains the source descriptors the core consumes and the result
//! values it produces.

use serde::{Deserialize, Serialize};

/// Status code carried by successful search/detail results
pub const STATUS_OK: u16 = 200;

/// Status code carried by failed search/detail results
pub const STATUS_FAILED: u16 = 400;

/// Default detail page path for sources scraped as HTML
pub const DEFAULT_HTML_DETAIL_PATH: &str = "/index.php/vod/detail/id/{id}.html";

/// Which play-list group of a `vod_play_url` field holds the episodes to use
///
/// Upstream play-list fields may carry several groups (one per player or
/// CDN line). Sources disagree on which group is the usable one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayGroup {
    First,
    #[default]
    Last,
}

/// Settings for sources whose structured detail API is unreliable
///
/// Such sources are resolved by scraping their detail HTML page instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlDetailConfig {
    /// Path appended to the detail base URL; `{id}` is replaced by the item id
    pub path_template: String,

    /// Source-specific regex tried before the generic `.m3u8` pattern.
    /// Capture group 1 is used when present, the whole match otherwise.
    pub episode_pattern: Option<String>,
}

impl Default for HtmlDetailConfig {
    fn default() -> Self {
        Self {
            path_template: DEFAULT_HTML_DETAIL_PATH.to_string(),
            episode_pattern: None,
        }
    }
}

/// One upstream video index endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique source id
    pub id: String,

    /// Human-readable source name
    pub name: String,

    /// Base URL the search path is appended to
    pub search_base_url: String,

    /// Base URL the detail path is appended to
    pub detail_base_url: String,

    /// Play-list group selection for episode extraction
    #[serde(default)]
    pub play_group: PlayGroup,

    /// Present for "special" sources resolved through HTML scraping
    #[serde(default)]
    pub html_detail: Option<HtmlDetailConfig>,
}

impl SourceDescriptor {
    /// Creates a descriptor using the same base URL for search and detail
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            id: id.into(),
            name: name.into(),
            search_base_url: base_url.clone(),
            detail_base_url: base_url,
            play_group: PlayGroup::default(),
            html_detail: None,
        }
    }

    /// Whether detail lookups bypass the JSON API and scrape HTML
    pub fn is_special(&self) -> bool {
        self.html_detail.is_some()
    }
}

/// A normalized search hit from one source
///
/// Identity across sources is the `(source_id, item_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub item_id: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub remarks: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub area: Option<String>,
    pub director: Option<String>,
    pub actor: Option<String>,
    pub synopsis: Option<String>,
    pub source_id: String,
    pub source_name: String,
}

impl SearchResultItem {
    /// Dedup key identifying this item across all sources
    pub fn dedup_key(&self) -> (String, String) {
        (self.source_id.clone(), self.item_id.clone())
    }
}

/// Outcome of a single-source search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// [`STATUS_OK`] or [`STATUS_FAILED`]
    pub status_code: u16,
    pub list: Vec<SearchResultItem>,
    pub message: Option<String>,
}

impl SearchResponse {
    /// Successful search carrying the normalized items
    pub fn ok(list: Vec<SearchResultItem>) -> Self {
        Self {
            status_code: STATUS_OK,
            list,
            message: None,
        }
    }

    /// Failed call with status 400 and a reason
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_FAILED,
            list: Vec::new(),
            message: Some(message.into()),
        }
    }

    /// True for status 200
    pub fn is_ok(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

/// Descriptive metadata for a single video
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDetail {
    pub title: String,
    pub cover: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub area: Option<String>,
    pub director: Option<String>,
    pub actor: Option<String>,
    pub remarks: Option<String>,
    pub source_id: String,
    pub source_name: String,
}

/// Outcome of a detail lookup
///
/// An empty `episodes` list with [`STATUS_OK`] means the video exists but
/// no playable stream was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailResult {
    /// [`STATUS_OK`] or [`STATUS_FAILED`]
    pub status_code: u16,

    /// Playable stream URLs in upstream order
    pub episodes: Vec<String>,

    /// The detail URL that was fetched
    pub detail_page_url: Option<String>,

    pub video_info: Option<VideoDetail>,

    pub message: Option<String>,
}

impl DetailResult {
    /// Successful lookup; `episodes` may be empty
    pub fn ok(episodes: Vec<String>, detail_page_url: String, video_info: VideoDetail) -> Self {
        Self {
            status_code: STATUS_OK,
            episodes,
            detail_page_url: Some(detail_page_url),
            video_info: Some(video_info),
            message: None,
        }
    }

    /// Failed call with status 400 and a reason
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_FAILED,
            episodes: Vec::new(),
            detail_page_url: None,
            video_info: None,
            message: Some(message.into()),
        }
    }

    /// True for status 200
    pub fn is_ok(&self) -> bool {
        self.status_code == STATUS_OK
    }
}
