//! vodhub Core Library
//!
//! Async API for searching many independent video index APIs at once and
//! resolving playable episode URLs.
//!
//! # Overview
//!
//! This crate provides:
//! - An upstream client routing every call through a relay with a bounded wait
//! - An episode extractor for nested play-list fields, free-text links and
//!   scraped detail pages
//! - A FIFO concurrency limiter capping simultaneous upstream calls
//! - An aggregator streaming deduplicated results as each source answers
//!
//! # Example
//!
//! ```no_run
//! use vodhub_core::{Result, SearchAggregator, SearchResultItem, StaticRegistry, SourceRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = StaticRegistry::from_path("sources.json")?;
//!     let aggregator = SearchAggregator::new()?;
//!
//!     // Batches arrive as each source answers
//!     aggregator
//!         .search_enabled("wandering earth", &registry, |batch: Vec<SearchResultItem>| {
//!             for item in batch {
//!                 println!("[{}] {} ({})", item.source_name, item.title, item.item_id);
//!             }
//!         }, None)
//!         .await?;
//!
//!     // Resolve playable episodes for one hit
//!     if let Some(source) = registry.enabled_sources().first() {
//!         let detail = aggregator.detail("12345", source).await;
//!         for url in &detail.episodes {
//!             println!("{}", url);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Failure handling
//!
//! [`UpstreamClient::search`] and [`UpstreamClient::detail`] never return
//! errors: failures come back as results with status code 400 and a message.
//! An aggregated search only fails when it is cancelled.

mod aggregator;
mod client;
mod error;
mod limiter;
pub mod parser;
mod registry;
mod types;
pub mod url;

// Re-export aggregator types
pub use aggregator::{
    AggregatorConfig, BatchSink, DEFAULT_CONCURRENCY, SearchAggregator, sort_results,
};

// Re-export client types
pub use client::{ClientConfig, DEFAULT_RELAY_URL, DEFAULT_TIMEOUT, UpstreamClient};

// Re-export error types
pub use error::{Result, VodError};

// Re-export the limiter
pub use limiter::ConcurrencyLimiter;

// Re-export parser entry points
pub use parser::{DetailPayload, EpisodeExtractor};

// Re-export registry types
pub use registry::{SourceEntry, SourceRegistry, StaticRegistry, parse_sources};

// Re-export data types
pub use types::{
    DetailResult, HtmlDetailConfig, PlayGroup, STATUS_FAILED, STATUS_OK, SearchResponse,
    SearchResultItem, SourceDescriptor, VideoDetail,
};

// Cancellation handle accepted by aggregated searches
pub use tokio_util::sync::CancellationToken;
