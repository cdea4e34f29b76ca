//! vodhub command line front end
//!
//! Thin wrapper over `vodhub-core`: loads a source list, runs searches with
//! streamed output and resolves episode lists.

mod cli;
mod output;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vodhub_core::{
    AggregatorConfig, CancellationToken, ClientConfig, SearchAggregator, SearchResultItem,
    SourceRegistry, StaticRegistry, UpstreamClient, VodError,
};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli).await
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let registry = load_registry(&cli)?;

    match &cli.command {
        Commands::Sources => output::print_sources(registry.entries(), cli.json),
        Commands::Search { query, sorted } => {
            let aggregator = build_aggregator(&cli)?;
            let sources = registry.enabled_sources();
            if sources.is_empty() {
                bail!("no enabled sources; pass a source list with --sources");
            }

            if *sorted {
                let items = aggregator.search_all(query, &sources).await?;
                eprintln!("{} results from {} sources", items.len(), sources.len());
                return output::print_items(&items, cli.json);
            }

            stream_search(&aggregator, query, &sources, cli.json).await
        }
        Commands::Detail { source, item_id } => {
            let aggregator = build_aggregator(&cli)?;
            let Some(descriptor) = registry.get(source) else {
                bail!("unknown source id: {}", source);
            };

            let detail = aggregator.detail(item_id, descriptor).await;
            if !detail.is_ok() {
                bail!(
                    "detail lookup failed: {}",
                    detail.message.as_deref().unwrap_or("unknown error")
                );
            }
            output::print_detail(&detail, cli.json)
        }
    }
}

/// Prints batches as sources answer until every source settles or Ctrl-C
async fn stream_search(
    aggregator: &SearchAggregator,
    query: &str,
    sources: &[vodhub_core::SourceDescriptor],
    json: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let total = Arc::new(AtomicUsize::new(0));
    let sink = {
        let total = Arc::clone(&total);
        move |batch: Vec<SearchResultItem>| {
            total.fetch_add(batch.len(), Ordering::Relaxed);
            if let Err(e) = output::print_items(&batch, json) {
                tracing::warn!(error = %e, "failed to print batch");
            }
        }
    };

    let result = aggregator.search(query, sources, sink, Some(&cancel)).await;
    interrupt.abort();

    let total = total.load(Ordering::Relaxed);
    match result {
        Ok(()) => {
            eprintln!("{} results from {} sources", total, sources.len());
            Ok(())
        }
        Err(VodError::Cancelled) => {
            eprintln!("Search cancelled after {} results", total);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn load_registry(cli: &Cli) -> Result<StaticRegistry> {
    match &cli.sources {
        Some(path) => StaticRegistry::from_path(path)
            .with_context(|| format!("failed to load sources from {}", path.display())),
        None => Ok(StaticRegistry::default()),
    }
}

/// Environment defaults, then command line flags on top
fn build_aggregator(cli: &Cli) -> Result<SearchAggregator> {
    let mut client_config = ClientConfig::from_env();
    if let Some(relay) = &cli.relay {
        client_config.relay_url = Some(relay.clone());
    }
    if cli.no_relay {
        client_config.relay_url = None;
    }
    if let Some(secs) = cli.timeout {
        client_config.timeout = Duration::from_secs(secs);
    }

    let mut aggregator_config = AggregatorConfig::from_env();
    if let Some(concurrency) = cli.concurrency {
        aggregator_config.concurrency = concurrency.max(1);
    }

    let client = UpstreamClient::with_config(client_config)
        .context("failed to build the HTTP client")?;
    Ok(SearchAggregator::with_client(client, aggregator_config))
}
