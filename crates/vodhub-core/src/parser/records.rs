//! Upstream JSON record parser
//!
//! Parses `{ "list": [...] }` payloads of the `api.php/provide/vod` API family
//! into loosely-typed records and normalizes them into crate types.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Result, VodError};
use crate::types::{SearchResultItem, SourceDescriptor, VideoDetail};

/// Envelope of every search/detail response; `list` is the only required field
#[derive(Debug, Deserialize)]
struct VodListResponse {
    list: Vec<Value>,
}

/// One upstream record using the `vod_` field prefix convention
///
/// Every field is optional. Upstreams disagree on whether ids are strings or
/// numbers, so scalar fields accept both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VodRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_pic: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub type_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_area: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_director: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_actor: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_content: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vod_play_url: Option<String>,
}

/// Accepts strings and numbers, maps empty strings and other JSON types to `None`
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parses a response body and returns its records
///
/// # Errors
/// Returns `MalformedResponse` if the body is not JSON or has no `list` array.
/// Individual list entries that are not objects are skipped.
pub fn parse_vod_list(body: &str) -> Result<Vec<VodRecord>> {
    let response: VodListResponse = serde_json::from_str(body).map_err(|e| {
        VodError::MalformedResponse(format!("expected JSON with a `list` array: {}", e))
    })?;

    let records = response
        .list
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<VodRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable upstream record");
                None
            }
        })
        .collect();

    Ok(records)
}

/// Normalizes upstream records into search results tagged with their source
///
/// Records without an id cannot be deduplicated or looked up later and are dropped.
/// Upstream order is preserved.
pub fn normalize_search_results(
    records: Vec<VodRecord>,
    source: &SourceDescriptor,
) -> Vec<SearchResultItem> {
    records
        .into_iter()
        .filter_map(|record| {
            let Some(item_id) = record.vod_id else {
                tracing::debug!(source = %source.id, "skipping record without vod_id");
                return None;
            };
            Some(SearchResultItem {
                item_id,
                title: record.vod_name.unwrap_or_default(),
                poster_url: record.vod_pic,
                remarks: record.vod_remarks,
                category: record.type_name,
                year: record.vod_year,
                area: record.vod_area,
                director: record.vod_director,
                actor: record.vod_actor,
                synopsis: record.vod_content,
                source_id: source.id.clone(),
                source_name: source.name.clone(),
            })
        })
        .collect()
}

/// Builds the detail metadata for a record
pub fn video_detail_from_record(record: &VodRecord, source: &SourceDescriptor) -> VideoDetail {
    VideoDetail {
        title: record.vod_name.clone().unwrap_or_default(),
        cover: record.vod_pic.clone(),
        description: record.vod_content.clone(),
        category: record.type_name.clone(),
        year: record.vod_year.clone(),
        area: record.vod_area.clone(),
        director: record.vod_director.clone(),
        actor: record.vod_actor.clone(),
        remarks: record.vod_remarks.clone(),
        source_id: source.id.clone(),
        source_name: source.name.clone(),
    }
}
