//! Aggregated multi-source search
//!
//! Fans a query out to every enabled source through a [`ConcurrencyLimiter`],
//! deduplicates results by `(source_id, item_id)` and streams each source's
//! newly-unique items to a caller-supplied sink as soon as they arrive.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::client::UpstreamClient;
use crate::error::{Result, VodError};
use crate::limiter::ConcurrencyLimiter;
use crate::registry::SourceRegistry;
use crate::types::{DetailResult, SearchResultItem, SourceDescriptor};

/// Default number of sources queried at the same time
pub const DEFAULT_CONCURRENCY: usize = 3;

type DedupSet = HashSet<(String, String)>;

/// Configuration for the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum number of in-flight source searches (default: 3)
    pub concurrency: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl AggregatorConfig {
    /// Defaults overridden by `VODHUB_CONCURRENCY`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(concurrency) = std::env::var("VODHUB_CONCURRENCY")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        {
            config.concurrency = concurrency.max(1);
        }
        config
    }
}

/// Receives incremental result batches
///
/// Each batch holds only items not emitted earlier in the same search, in
/// upstream order. Batches from different sources arrive in completion order.
pub trait BatchSink: Send + 'static {
    fn on_batch(&mut self, items: Vec<SearchResultItem>);
}

impl<F> BatchSink for F
where
    F: FnMut(Vec<SearchResultItem>) + Send + 'static,
{
    fn on_batch(&mut self, items: Vec<SearchResultItem>) {
        self(items)
    }
}

impl BatchSink for tokio::sync::mpsc::UnboundedSender<Vec<SearchResultItem>> {
    fn on_batch(&mut self, items: Vec<SearchResultItem>) {
        // A closed receiver means nobody is listening anymore.
        let _ = self.send(items);
    }
}

/// Multi-source search front end
///
/// Combines the upstream client with a per-search concurrency limit and
/// dedup set.
pub struct SearchAggregator {
    client: Arc<UpstreamClient>,
    config: AggregatorConfig,
}

impl SearchAggregator {
    /// Create an aggregator with default client and aggregator configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(UpstreamClient::new()?, AggregatorConfig::default()))
    }

    /// Create an aggregator around an existing client
    pub fn with_client(client: UpstreamClient, config: AggregatorConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }

    /// The upstream client used for searches
    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Search all `sources`, streaming newly-unique items to `sink`
    ///
    /// At most `concurrency` sources are queried at once. A failing source is
    /// logged and contributes nothing; it never fails the aggregate.
    ///
    /// # Returns
    /// `Ok(())` once every source has settled. With no sources it returns
    /// immediately without touching the sink.
    ///
    /// # Errors
    /// `Cancelled` as soon as `cancel` fires. Source searches already in
    /// flight are left to finish in the background but invoke the sink no more.
    /// Dropping the returned future has the same effect on the source tasks.
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> vodhub_core::Result<()> {
    /// use vodhub_core::{SearchAggregator, SearchResultItem, SourceDescriptor};
    /// let aggregator = SearchAggregator::new()?;
    /// let sources = vec![SourceDescriptor::new("a", "Source A", "https://a.example")];
    /// aggregator
    ///     .search("wandering earth", &sources, |batch: Vec<SearchResultItem>| {
    ///         println!("{} new results", batch.len());
    ///     }, None)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search<S>(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
        sink: S,
        cancel: Option<&CancellationToken>,
    ) -> Result<()>
    where
        S: BatchSink,
    {
        if sources.is_empty() {
            tracing::debug!("no sources enabled, skipping search");
            return Ok(());
        }

        let cancel = cancel.cloned().unwrap_or_default();
        if cancel.is_cancelled() {
            return Err(VodError::Cancelled);
        }

        // Source tasks outlive this future only until it is dropped
        let scope = cancel.child_token();
        let _scope_guard = scope.clone().drop_guard();

        let limiter = ConcurrencyLimiter::new(self.config.concurrency);
        let seen: Arc<Mutex<DedupSet>> = Arc::new(Mutex::new(HashSet::new()));
        let sink = Arc::new(Mutex::new(sink));
        let query: Arc<str> = Arc::from(query);

        let handles: Vec<_> = sources
            .iter()
            .cloned()
            .map(|source| {
                let task = SourceTask {
                    client: Arc::clone(&self.client),
                    query: Arc::clone(&query),
                    source,
                    seen: Arc::clone(&seen),
                    sink: Arc::clone(&sink),
                    cancel: scope.clone(),
                };
                tokio::spawn(limiter.submit(move || task.run()))
            })
            .collect();

        tokio::select! {
            results = join_all(handles) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "source search task aborted");
                    }
                }
                Ok(())
            }
            _ = scope.cancelled() => {
                tracing::debug!("aggregated search cancelled");
                Err(VodError::Cancelled)
            }
        }
    }

    /// Search the sources currently enabled in `registry`
    pub async fn search_enabled<R, S>(
        &self,
        query: &str,
        registry: &R,
        sink: S,
        cancel: Option<&CancellationToken>,
    ) -> Result<()>
    where
        R: SourceRegistry + ?Sized,
        S: BatchSink,
    {
        let sources = registry.enabled_sources();
        self.search(query, &sources, sink, cancel).await
    }

    /// Search all `sources` and return every unique item, sorted
    ///
    /// See [`sort_results`] for the ordering.
    pub async fn search_all(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
    ) -> Result<Vec<SearchResultItem>> {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let collected = Arc::clone(&collected);
            move |batch: Vec<SearchResultItem>| {
                collected
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(batch);
            }
        };
        self.search(query, sources, sink, None).await?;

        let mut items =
            std::mem::take(&mut *collected.lock().unwrap_or_else(PoisonError::into_inner));
        sort_results(&mut items);
        Ok(items)
    }

    /// Fetch playable episodes and metadata for one item
    pub async fn detail(&self, item_id: &str, source: &SourceDescriptor) -> DetailResult {
        self.client.detail(item_id, source).await
    }
}

/// One source's share of an aggregated search
struct SourceTask<S> {
    client: Arc<UpstreamClient>,
    query: Arc<str>,
    source: SourceDescriptor,
    seen: Arc<Mutex<DedupSet>>,
    sink: Arc<Mutex<S>>,
    cancel: CancellationToken,
}

impl<S: BatchSink> SourceTask<S> {
    async fn run(self) {
        if self.cancel.is_cancelled() {
            return;
        }

        let response = self.client.search(&self.query, &self.source).await;
        if !response.is_ok() {
            tracing::debug!(
                source = %self.source.id,
                reason = response.message.as_deref().unwrap_or_default(),
                "source contributed no results"
            );
            return;
        }
        if self.cancel.is_cancelled() {
            return;
        }

        let fresh = {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            response
                .list
                .into_iter()
                .filter(|item| seen.insert(item.dedup_key()))
                .collect::<Vec<_>>()
        };
        if fresh.is_empty() {
            return;
        }

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::debug!(source = %self.source.id, count = fresh.len(), "emitting batch");
        sink.on_batch(fresh);
    }
}

/// Orders results by title, then by source name
pub fn sort_results(items: &mut [SearchResultItem]) {
    items.sort_by(|a, b| {
        a.title
            .cmp(&b.title)
            .then_with(|| a.source_name.cmp(&b.source_name))
    });
}
