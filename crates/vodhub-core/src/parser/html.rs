//! Detail page scraper for sources without a usable JSON API
//!
//! Extracts `.m3u8` links, the title and the synopsis from a raw detail page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::parser::episodes::M3U8_RE;

/// A parenthetical annotation at the very end of a link, e.g. `(HD)`
static ANNOTATION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)$").ok());

/// Title and synopsis scraped from a detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPage {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Extracts episode links from a detail page
///
/// Tries the source-specific `pattern` first, then the generic `$...m3u8`
/// pattern. Links are deduplicated in first-seen order, stripped of the
/// leading `$` and of any trailing parenthetical annotation.
pub fn extract_html_episodes(html: &str, pattern: Option<&Regex>) -> Vec<String> {
    if let Some(re) = pattern {
        let links = collect_links(html, re);
        if !links.is_empty() {
            return links;
        }
    }

    let Some(re) = M3U8_RE.as_ref() else {
        return Vec::new();
    };
    collect_links(html, re)
}

/// Scrapes the first `<h1>` as title and the `.sketch` block as synopsis
pub fn parse_detail_page(html: &str) -> DetailPage {
    let document = Html::parse_document(html);

    DetailPage {
        title: first_text(&document, "h1"),
        description: first_text(&document, ".sketch"),
    }
}

fn collect_links(html: &str, re: &Regex) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for caps in re.captures_iter(html) {
        let raw = caps
            .get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let link = clean_link(raw);
        if link.is_empty() {
            continue;
        }
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

/// Strips the leading `$` and a trailing `(annotation)`; parentheses inside
/// the path are kept
fn clean_link(raw: &str) -> String {
    let link = raw.trim().trim_start_matches('$');
    match ANNOTATION_RE.as_ref().and_then(|re| re.find(link)) {
        Some(m) if m.start() > 0 => link[..m.start()].trim_end().to_string(),
        _ => link.to_string(),
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() { None } else { Some(text) }
}
