//! Source registry
//!
//! The core never reads persisted preferences itself; callers hand it a
//! [`SourceRegistry`]. [`StaticRegistry`] is a ready-made implementation fed
//! from the JSON source import format.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, VodError};
use crate::types::{HtmlDetailConfig, PlayGroup, SourceDescriptor, DEFAULT_HTML_DETAIL_PATH};

/// Supplies the sources an aggregated search should query
pub trait SourceRegistry: Send + Sync {
    /// Sources currently enabled, in display order
    fn enabled_sources(&self) -> Vec<SourceDescriptor>;
}

/// A source together with its enabled flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub descriptor: SourceDescriptor,
    pub enabled: bool,
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: Vec<SourceEntry>,
}

impl StaticRegistry {
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        Self { entries }
    }

    /// Build a registry from the JSON import format, see [`parse_sources`]
    pub fn from_json(json: &str) -> Result<Self> {
        parse_sources(json).map(Self::new)
    }

    /// Read a JSON import file
    ///
    /// # Errors
    /// - `InvalidInput` if the file cannot be read or fails validation
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            VodError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    /// Enable or disable a source by id; returns false for unknown ids
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.descriptor.id == id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Look up a source by id regardless of its enabled flag
    pub fn get(&self, id: &str) -> Option<&SourceDescriptor> {
        self.entries
            .iter()
            .map(|e| &e.descriptor)
            .find(|d| d.id == id)
    }
}

impl SourceRegistry for StaticRegistry {
    fn enabled_sources(&self) -> Vec<SourceDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.descriptor.clone())
            .collect()
    }
}

/// One entry of the JSON import format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedSource {
    id: Option<String>,
    name: Option<String>,
    url: Option<String>,
    detail_url: Option<String>,
    is_enabled: Option<bool>,
    play_group: Option<PlayGroup>,
    html_detail: Option<ImportedHtmlDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedHtmlDetail {
    path_template: Option<String>,
    episode_pattern: Option<String>,
}

/// Parses the JSON source import format
///
/// Accepts an array of sources or a single source object:
///
/// ```json
/// [{"id": "a", "name": "Source A", "url": "https://a.example",
///   "detailUrl": "https://detail.a.example", "isEnabled": true,
///   "playGroup": "first", "htmlDetail": {"episodePattern": "..."}}]
/// ```
///
/// `name` and `url` are required; `url` and `detailUrl` must be absolute
/// URLs. A missing `id` gets a random UUID, a missing `detailUrl` falls back
/// to `url`, and sources are enabled unless `isEnabled` is `false`.
///
/// # Errors
/// `InvalidInput` naming the 1-based position of the first bad entry
pub fn parse_sources(json: &str) -> Result<Vec<SourceEntry>> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| VodError::InvalidInput(format!("source list is not valid JSON: {}", e)))?;
    let values = match value {
        serde_json::Value::Array(values) => values,
        other => vec![other],
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let position = index + 1;
            let imported: ImportedSource = serde_json::from_value(value).map_err(|e| {
                VodError::InvalidInput(format!("source #{} is malformed: {}", position, e))
            })?;
            entry_from_import(imported, position)
        })
        .collect()
}

fn entry_from_import(imported: ImportedSource, position: usize) -> Result<SourceEntry> {
    let (Some(name), Some(url)) = (non_empty(imported.name), non_empty(imported.url)) else {
        return Err(VodError::InvalidInput(format!(
            "source #{} is missing required fields `name` and `url`",
            position
        )));
    };
    validate_url(&url, position, "url")?;

    let detail_url = match non_empty(imported.detail_url) {
        Some(detail_url) => {
            validate_url(&detail_url, position, "detailUrl")?;
            detail_url
        }
        None => url.clone(),
    };

    let html_detail = imported.html_detail.map(|html| HtmlDetailConfig {
        path_template: non_empty(html.path_template)
            .unwrap_or_else(|| DEFAULT_HTML_DETAIL_PATH.to_string()),
        episode_pattern: non_empty(html.episode_pattern),
    });

    Ok(SourceEntry {
        descriptor: SourceDescriptor {
            id: non_empty(imported.id).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name,
            search_base_url: url,
            detail_base_url: detail_url,
            play_group: imported.play_group.unwrap_or_default(),
            html_detail,
        },
        enabled: imported.is_enabled.unwrap_or(true),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_url(value: &str, position: usize, field: &str) -> Result<()> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(VodError::InvalidInput(format!(
            "source #{} has an invalid `{}`: {}",
            position, field, value
        ))),
    }
}
