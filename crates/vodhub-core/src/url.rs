//! URL helper functions for upstream video index APIs
//!
//! Provides functions for building search, detail and relay URLs.

/// Search path of the common `api.php/provide/vod` API
pub const SEARCH_PATH: &str = "/api.php/provide/vod/?ac=videolist&wd=";

/// Detail path of the common `api.php/provide/vod` API
pub const DETAIL_PATH: &str = "/api.php/provide/vod/?ac=videolist&ids=";

fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Builds the search URL for a given query
///
/// # Example
/// ```
/// use vodhub_core::url::build_search_url;
/// let url = build_search_url("https://api.example.com", "doctor who");
/// assert_eq!(url, "https://api.example.com/api.php/provide/vod/?ac=videolist&wd=doctor%20who");
/// ```
pub fn build_search_url(base_url: &str, query: &str) -> String {
    format!("{}{}{}", trim_base(base_url), SEARCH_PATH, urlencoding::encode(query))
}

/// Builds the JSON detail URL for an item id
///
/// # Example
/// ```
/// use vodhub_core::url::build_detail_url;
/// let url = build_detail_url("https://api.example.com/", "123");
/// assert_eq!(url, "https://api.example.com/api.php/provide/vod/?ac=videolist&ids=123");
/// ```
pub fn build_detail_url(base_url: &str, item_id: &str) -> String {
    format!("{}{}{}", trim_base(base_url), DETAIL_PATH, item_id)
}

/// Builds the HTML detail page URL from a path template containing `{id}`
///
/// # Example
/// ```
/// use vodhub_core::url::build_html_detail_url;
/// let url = build_html_detail_url("https://site.example", "/vod/detail/id/{id}.html", "77");
/// assert_eq!(url, "https://site.example/vod/detail/id/77.html");
/// ```
pub fn build_html_detail_url(base_url: &str, path_template: &str, item_id: &str) -> String {
    format!("{}{}", trim_base(base_url), path_template.replace("{id}", item_id))
}

/// Routes a target URL through the relay: `relay_url + urlencode(target)`
///
/// Without a relay the target URL is returned unchanged.
///
/// # Example
/// ```
/// use vodhub_core::url::build_relay_url;
/// let url = build_relay_url(Some("https://relay.example/?url="), "https://a.example/x?y=1");
/// assert_eq!(url, "https://relay.example/?url=https%3A%2F%2Fa.example%2Fx%3Fy%3D1");
/// assert_eq!(build_relay_url(None, "https://a.example/"), "https://a.example/");
/// ```
pub fn build_relay_url(relay_url: Option<&str>, target_url: &str) -> String {
    match relay_url {
        Some(relay) => format!("{}{}", relay, urlencoding::encode(target_url)),
        None => target_url.to_string(),
    }
}

/// Checks that an item id matches `^[\w-]+$` (ASCII word characters and `-`)
pub fn is_valid_item_id(item_id: &str) -> bool {
    !item_id.is_empty()
        && item_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
