//! Terminal rendering for search results, details and source lists

use anyhow::Result;
use vodhub_core::{DetailResult, SearchResultItem, SourceEntry};

pub fn print_items(items: &[SearchResultItem], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(items)?);
        return Ok(());
    }

    for item in items {
        let mut line = format!("[{}] {} ({})", item.source_name, item.title, item.item_id);
        let extras: Vec<&str> = [&item.year, &item.category, &item.remarks]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .collect();
        if !extras.is_empty() {
            line.push_str(" - ");
            line.push_str(&extras.join(" / "));
        }
        println!("{}", line);
    }
    Ok(())
}

pub fn print_detail(detail: &DetailResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(detail)?);
        return Ok(());
    }

    if let Some(info) = &detail.video_info {
        println!("{}", info.title);
        for (label, value) in [
            ("Year", &info.year),
            ("Area", &info.area),
            ("Director", &info.director),
            ("Actor", &info.actor),
            ("Remarks", &info.remarks),
        ] {
            if let Some(value) = value {
                println!("  {}: {}", label, value);
            }
        }
    }
    if let Some(url) = &detail.detail_page_url {
        println!("  Page: {}", url);
    }

    if detail.episodes.is_empty() {
        println!("No playable episodes found");
    }
    for (index, url) in detail.episodes.iter().enumerate() {
        println!("{:>4}. {}", index + 1, url);
    }
    Ok(())
}

pub fn print_sources(entries: &[SourceEntry], json: bool) -> Result<()> {
    if json {
        let descriptors: Vec<_> = entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "source": entry.descriptor,
                    "enabled": entry.enabled,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    for entry in entries {
        let marker = if entry.enabled { "*" } else { " " };
        let kind = if entry.descriptor.is_special() { " (html)" } else { "" };
        println!(
            "{} {:<16} {}{}  {}",
            marker, entry.descriptor.id, entry.descriptor.name, kind, entry.descriptor.search_base_url
        );
    }
    Ok(())
}
