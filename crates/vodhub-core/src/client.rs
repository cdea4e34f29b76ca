//! Upstream HTTP client
//!
//! Performs single timeout-bounded calls to one source's search or detail
//! endpoint through the relay, and collapses every failure into a
//! status-coded result so one bad source cannot break an aggregate search.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::error::{Result, VodError};
use crate::parser::{
    DetailPayload, EpisodeExtractor, VodRecord, normalize_search_results, parse_detail_page,
    parse_vod_list, video_detail_from_record,
};
use crate::types::{DetailResult, SearchResponse, SearchResultItem, SourceDescriptor, VideoDetail};
use crate::url::{
    build_detail_url, build_html_detail_url, build_relay_url, build_search_url, is_valid_item_id,
};

/// Relay used when none is configured
pub const DEFAULT_RELAY_URL: &str = "https://cors.zme.ink/";

/// Default wall-clock bound for one upstream call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Configuration for the upstream client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay prefix; the encoded target URL is appended. `None` calls upstreams directly.
    pub relay_url: Option<String>,
    /// Per-call timeout (default: 10s)
    pub timeout: Duration,
    /// User-Agent sent upstream
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: Some(DEFAULT_RELAY_URL.to_string()),
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `VODHUB_RELAY_URL` and `VODHUB_TIMEOUT_SECS`
    ///
    /// An empty `VODHUB_RELAY_URL` disables the relay.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(relay) = std::env::var("VODHUB_RELAY_URL") {
            let relay = relay.trim();
            config.relay_url = (!relay.is_empty()).then(|| relay.to_string());
        }
        if let Some(secs) = std::env::var("VODHUB_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// HTTP client for upstream video index APIs
///
/// Only `User-Agent` and `Accept` are sent upstream. Public `search`/`detail`
/// calls never return errors; failures come back as status 400 results.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    relay_url: Option<String>,
    timeout: Duration,
}

impl UpstreamClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(VodError::Client)?;

        Ok(Self {
            client,
            relay_url: config.relay_url,
            timeout: config.timeout,
        })
    }

    /// Search one source with the configured timeout
    pub async fn search(&self, query: &str, source: &SourceDescriptor) -> SearchResponse {
        self.search_with_timeout(query, source, self.timeout).await
    }

    /// Search one source with an explicit timeout
    ///
    /// Returned items are tagged with the source id and name and keep upstream order.
    pub async fn search_with_timeout(
        &self,
        query: &str,
        source: &SourceDescriptor,
        timeout: Duration,
    ) -> SearchResponse {
        match self.try_search(query, source, timeout).await {
            Ok(list) => SearchResponse::ok(list),
            Err(e) => {
                tracing::warn!(source = %source.id, error = %e, "search failed");
                SearchResponse::failed(e.to_string())
            }
        }
    }

    /// Fetch episodes and metadata for one item with the configured timeout
    pub async fn detail(&self, item_id: &str, source: &SourceDescriptor) -> DetailResult {
        self.detail_with_timeout(item_id, source, self.timeout).await
    }

    /// Fetch episodes and metadata for one item with an explicit timeout
    ///
    /// Sources with an HTML detail configuration are scraped instead of
    /// queried through the JSON API.
    pub async fn detail_with_timeout(
        &self,
        item_id: &str,
        source: &SourceDescriptor,
        timeout: Duration,
    ) -> DetailResult {
        let result = if source.is_special() {
            self.try_html_detail(item_id, source, timeout).await
        } else {
            self.try_json_detail(item_id, source, timeout).await
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(source = %source.id, item_id, error = %e, "detail failed");
            DetailResult::failed(e.to_string())
        })
    }

    async fn try_search(
        &self,
        query: &str,
        source: &SourceDescriptor,
        timeout: Duration,
    ) -> Result<Vec<SearchResultItem>> {
        if query.trim().is_empty() {
            return Err(VodError::InvalidInput(
                "search query cannot be empty".to_string(),
            ));
        }
        validate_base_url(&source.search_base_url, source)?;

        let url = build_search_url(&source.search_base_url, query);
        let body = self.fetch(&url, source, timeout).await?;
        let records = parse_vod_list(&body)?;

        Ok(normalize_search_results(records, source))
    }

    async fn try_json_detail(
        &self,
        item_id: &str,
        source: &SourceDescriptor,
        timeout: Duration,
    ) -> Result<DetailResult> {
        validate_item_id(item_id)?;
        validate_base_url(&source.detail_base_url, source)?;

        let url = build_detail_url(&source.detail_base_url, item_id);
        let body = self.fetch(&url, source, timeout).await?;
        let record: VodRecord = parse_vod_list(&body)?.into_iter().next().ok_or_else(|| {
            VodError::MalformedResponse("detail response has an empty `list`".to_string())
        })?;

        let episodes = EpisodeExtractor::for_source(source).extract(DetailPayload::Record(&record));
        if episodes.is_empty() {
            tracing::debug!(source = %source.id, item_id, "no playable episodes found");
        }

        Ok(DetailResult::ok(
            episodes,
            url,
            video_detail_from_record(&record, source),
        ))
    }

    async fn try_html_detail(
        &self,
        item_id: &str,
        source: &SourceDescriptor,
        timeout: Duration,
    ) -> Result<DetailResult> {
        validate_item_id(item_id)?;
        validate_base_url(&source.detail_base_url, source)?;
        let html_config = source.html_detail.clone().unwrap_or_default();

        let url = build_html_detail_url(&source.detail_base_url, &html_config.path_template, item_id);
        let html = self.fetch(&url, source, timeout).await?;

        let episodes = EpisodeExtractor::for_source(source).extract(DetailPayload::Html(&html));
        let page = parse_detail_page(&html);
        let video_info = VideoDetail {
            title: page.title.unwrap_or_default(),
            description: page.description,
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            ..Default::default()
        };

        Ok(DetailResult::ok(episodes, url, video_info))
    }

    /// Perform one GET through the relay and return the body
    ///
    /// # Errors
    /// - `UpstreamUnavailable` on network errors, timeout or a non-2xx status
    /// - `MalformedResponse` if the body cannot be read
    async fn fetch(
        &self,
        target_url: &str,
        source: &SourceDescriptor,
        timeout: Duration,
    ) -> Result<String> {
        let request_url = build_relay_url(self.relay_url.as_deref(), target_url);
        tracing::debug!(source = %source.id, url = %target_url, "requesting upstream");

        let response = self
            .client
            .get(&request_url)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VodError::UpstreamUnavailable(format!(
                "request failed with HTTP {}",
                status.as_u16()
            )));
        }

        Ok(response.text().await?)
    }
}

fn validate_item_id(item_id: &str) -> Result<()> {
    if is_valid_item_id(item_id) {
        Ok(())
    } else {
        Err(VodError::InvalidInput(format!("invalid item id: {:?}", item_id)))
    }
}

fn validate_base_url(base_url: &str, source: &SourceDescriptor) -> Result<()> {
    if base_url.trim().is_empty() {
        return Err(VodError::InvalidInput(format!(
            "source {} has no base URL configured",
            source.id
        )));
    }
    Ok(())
}
