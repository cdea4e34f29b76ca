//! Episode extraction
//!
//! Turns one upstream detail payload into an ordered list of playable
//! stream URLs. Structured records and scraped HTML pages go through the
//! same [`EpisodeExtractor`] so a source can switch strategy without the
//! caller noticing.

use std::sync::LazyLock;

use regex::Regex;

use crate::parser::html::extract_html_episodes;
use crate::parser::records::VodRecord;
use crate::types::{PlayGroup, SourceDescriptor};

/// Separates play-list groups inside `vod_play_url`
pub const GROUP_DELIMITER: &str = "$$$";

/// Separates episodes inside one group
pub const EPISODE_DELIMITER: char = '#';

/// Separates display name from URL inside one episode entry
pub const NAME_URL_DELIMITER: char = '$';

/// `$`-prefixed `.m3u8` links embedded in free text
pub const M3U8_PATTERN: &str = r#"\$https?://[^"'\s]+?\.m3u8"#;

pub(crate) static M3U8_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(M3U8_PATTERN).ok());

/// A raw detail payload as returned by the upstream
#[derive(Debug, Clone, Copy)]
pub enum DetailPayload<'a> {
    /// First record of a JSON detail response
    Record(&'a VodRecord),
    /// Raw HTML of a detail page
    Html(&'a str),
}

/// Per-source episode extraction settings
#[derive(Debug, Clone, Default)]
pub struct EpisodeExtractor {
    play_group: PlayGroup,
    html_pattern: Option<Regex>,
}

impl EpisodeExtractor {
    /// Create an extractor selecting the given play-list group
    pub fn new(play_group: PlayGroup) -> Self {
        Self {
            play_group,
            html_pattern: None,
        }
    }

    /// Add a source-specific pattern tried first on HTML pages
    ///
    /// An invalid pattern is logged and ignored; the generic pattern still applies.
    pub fn with_html_pattern(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => self.html_pattern = Some(re),
            Err(e) => tracing::warn!(pattern, error = %e, "ignoring invalid episode pattern"),
        }
        self
    }

    /// Build the extractor configured for a source
    pub fn for_source(source: &SourceDescriptor) -> Self {
        let extractor = Self::new(source.play_group);
        match source
            .html_detail
            .as_ref()
            .and_then(|html| html.episode_pattern.as_deref())
        {
            Some(pattern) => extractor.with_html_pattern(pattern),
            None => extractor,
        }
    }

    /// Extract episode URLs in source order
    ///
    /// Never fails: no match yields an empty list.
    pub fn extract(&self, payload: DetailPayload<'_>) -> Vec<String> {
        match payload {
            DetailPayload::Record(record) => self.extract_from_record(record),
            DetailPayload::Html(html) => extract_html_episodes(html, self.html_pattern.as_ref()),
        }
    }

    fn extract_from_record(&self, record: &VodRecord) -> Vec<String> {
        let episodes = record
            .vod_play_url
            .as_deref()
            .map(|play_url| parse_play_url(play_url, self.play_group))
            .unwrap_or_default();
        if !episodes.is_empty() {
            return episodes;
        }

        // Fallback: links embedded in the synopsis
        record
            .vod_content
            .as_deref()
            .map(scan_m3u8_links)
            .unwrap_or_default()
    }
}

/// Parses a `vod_play_url` field
///
/// Format: `group$$$group`, each group `entry#entry`, each entry `name$url`.
/// Only entries whose URL starts with `http://` or `https://` are kept.
pub fn parse_play_url(play_url: &str, play_group: PlayGroup) -> Vec<String> {
    let group = match play_group {
        PlayGroup::First => play_url.split(GROUP_DELIMITER).next(),
        PlayGroup::Last => play_url.rsplit(GROUP_DELIMITER).next(),
    };
    let Some(group) = group else {
        return Vec::new();
    };

    group
        .split(EPISODE_DELIMITER)
        .filter_map(|entry| entry.split(NAME_URL_DELIMITER).nth(1))
        .map(str::trim)
        .filter(|url| is_http_url(url))
        .map(str::to_string)
        .collect()
}

/// Finds `$https://....m3u8` links in free text and strips the leading `$`
pub fn scan_m3u8_links(text: &str) -> Vec<String> {
    let Some(re) = M3U8_RE.as_ref() else {
        return Vec::new();
    };

    re.find_iter(text)
        .map(|m| m.as_str().trim_start_matches('$').to_string())
        .collect()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HtmlDetailConfig;
    use proptest::prelude::*;

    fn record(play_url: Option<&str>, content: Option<&str>) -> VodRecord {
        VodRecord {
            vod_id: Some("1".to_string()),
            vod_play_url: play_url.map(str::to_string),
            vod_content: content.map(str::to_string),
            ..Default::default()
        }
    }

    // -----------------------------------------------------------------------
    // parse_play_url
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_play_url_single_group() {
        let episodes = parse_play_url(
            "groupA#name1$http://x/1.m3u8#name2$http://x/2.m3u8",
            PlayGroup::Last,
        );
        assert_eq!(episodes, vec!["http://x/1.m3u8", "http://x/2.m3u8"]);
    }

    #[test]
    fn test_parse_play_url_group_selection() {
        let play_url = "ep1$https://a/1.mp4#ep2$https://a/2.mp4$$$ep1$https://b/1.m3u8";

        assert_eq!(
            parse_play_url(play_url, PlayGroup::First),
            vec!["https://a/1.mp4", "https://a/2.mp4"]
        );
        assert_eq!(parse_play_url(play_url, PlayGroup::Last), vec!["https://b/1.m3u8"]);
    }

    #[test]
    fn test_parse_play_url_drops_non_http_entries() {
        let episodes = parse_play_url(
            "ep1$ftp://x/1#ep2$/relative/2.m3u8#ep3$https://x/3.m3u8#broken",
            PlayGroup::First,
        );
        assert_eq!(episodes, vec!["https://x/3.m3u8"]);
    }

    #[test]
    fn test_parse_play_url_empty() {
        assert!(parse_play_url("", PlayGroup::Last).is_empty());
    }

    // -----------------------------------------------------------------------
    // scan_m3u8_links
    // -----------------------------------------------------------------------

    #[test]
    fn test_scan_m3u8_links() {
        let links = scan_m3u8_links("intro $https://y/3.m3u8 more text $http://z/4.m3u8.");
        assert_eq!(links, vec!["https://y/3.m3u8", "http://z/4.m3u8"]);
    }

    #[test]
    fn test_scan_m3u8_links_requires_dollar_prefix() {
        assert!(scan_m3u8_links("see https://y/3.m3u8").is_empty());
    }

    #[test]
    fn test_shared_m3u8_regex_compiles_once() {
        let first = M3U8_RE.as_ref().expect("pattern should compile");
        let second = M3U8_RE.as_ref().expect("pattern should compile");
        assert!(std::ptr::eq(first, second));
        assert_eq!(scan_m3u8_links("$https://a/1.m3u8 $https://b/2.m3u8").len(), 2);
    }

    // -----------------------------------------------------------------------
    // EpisodeExtractor: structured records
    // -----------------------------------------------------------------------

    #[test]
    fn test_extract_prefers_play_url() {
        let extractor = EpisodeExtractor::new(PlayGroup::Last);
        let record = record(
            Some("e1$https://x/1.m3u8"),
            Some("$https://content/ignored.m3u8"),
        );
        assert_eq!(
            extractor.extract(DetailPayload::Record(&record)),
            vec!["https://x/1.m3u8"]
        );
    }

    #[test]
    fn test_extract_falls_back_to_content() {
        let extractor = EpisodeExtractor::new(PlayGroup::Last);
        let record = record(Some(""), Some("...$https://y/3.m3u8 more text"));
        assert_eq!(
            extractor.extract(DetailPayload::Record(&record)),
            vec!["https://y/3.m3u8"]
        );
    }

    #[test]
    fn test_extract_nothing_found() {
        let extractor = EpisodeExtractor::new(PlayGroup::First);
        let record = record(None, Some("no links here"));
        assert!(extractor.extract(DetailPayload::Record(&record)).is_empty());
    }

    // -----------------------------------------------------------------------
    // EpisodeExtractor: configuration
    // -----------------------------------------------------------------------

    #[test]
    fn test_for_source_uses_play_group() {
        let mut source = SourceDescriptor::new("a", "A", "https://a");
        source.play_group = PlayGroup::First;
        let extractor = EpisodeExtractor::for_source(&source);
        let record = record(Some("e$https://first/1.m3u8$$$e$https://last/1.m3u8"), None);
        assert_eq!(
            extractor.extract(DetailPayload::Record(&record)),
            vec!["https://first/1.m3u8"]
        );
    }

    #[test]
    fn test_for_source_compiles_html_pattern() {
        let mut source = SourceDescriptor::new("a", "A", "https://a");
        source.html_detail = Some(HtmlDetailConfig {
            episode_pattern: Some(r"\$(https://tight/\d+/index\.m3u8)".to_string()),
            ..Default::default()
        });
        let extractor = EpisodeExtractor::for_source(&source);
        let html = "<p>$https://tight/1/index.m3u8 $https://loose/x.m3u8</p>";
        assert_eq!(
            extractor.extract(DetailPayload::Html(html)),
            vec!["https://tight/1/index.m3u8"]
        );
    }

    #[test]
    fn test_invalid_html_pattern_is_ignored() {
        let extractor = EpisodeExtractor::new(PlayGroup::Last).with_html_pattern("([unclosed");
        let html = "<p>$https://loose/x.m3u8</p>";
        assert_eq!(
            extractor.extract(DetailPayload::Html(html)),
            vec!["https://loose/x.m3u8"]
        );
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_play_url_preserves_episode_order(
            entries in prop::collection::vec(("[a-z0-9]{1,8}", "[a-z0-9]{1,12}"), 0..20)
        ) {
            let play_url = entries
                .iter()
                .map(|(name, path)| format!("{}$https://cdn.test/{}.m3u8", name, path))
                .collect::<Vec<_>>()
                .join("#");
            let expected: Vec<String> = entries
                .iter()
                .map(|(_, path)| format!("https://cdn.test/{}.m3u8", path))
                .collect();

            prop_assert_eq!(parse_play_url(&play_url, PlayGroup::First), expected.clone());
            prop_assert_eq!(parse_play_url(&play_url, PlayGroup::Last), expected);
        }
    }
}
