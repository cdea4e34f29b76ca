use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Search many video index APIs at once and resolve playable episodes
#[derive(Parser, Debug)]
#[command(name = "vodhub", version)]
#[command(about = "Multi-source video search aggregator", long_about = None)]
pub struct Cli {
    /// JSON file listing the sources to query
    #[arg(short, long, global = true, env = "VODHUB_SOURCES")]
    pub sources: Option<PathBuf>,

    /// Relay prefix; the encoded upstream URL is appended to it
    #[arg(long, global = true, conflicts_with = "no_relay")]
    pub relay: Option<String>,

    /// Call upstream APIs directly instead of through the relay
    #[arg(long, global = true)]
    pub no_relay: bool,

    /// Per-request timeout in seconds
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,

    /// Maximum number of sources queried at once
    #[arg(short, long, global = true)]
    pub concurrency: Option<usize>,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search every enabled source, printing results as each source answers
    Search {
        /// Query to search for
        query: String,

        /// Wait for all sources and print one sorted list
        #[arg(long)]
        sorted: bool,
    },
    /// Resolve playable episodes for one item
    Detail {
        /// Source id as listed by `vodhub sources`
        source: String,
        /// Item id as returned by a search
        item_id: String,
    },
    /// List the configured sources
    Sources,
}
