use clap::{Parser, Subcommand};

use crate::log_args::LogArgs;

#[derive(Debug, Parser)]
#[clap(name = "indexer", author = "Indexer Contributors", version)]
pub(crate) struct Arguments {
    #[clap(subcommand)]
    pub(crate) sub: Subcommands,

    /// Path to the JSON configuration file.
    #[clap(long, short, global = true, default_value = "./config.json")]
    pub(crate) config: String,

    #[clap(flatten)]
    pub(crate) logs: LogArgs,
}

#[derive(Debug, Subcommand)]
#[clap(about = "Event indexer and state-reconstruction engine for an EVM protocol.")]
pub(crate) enum Subcommands {
    #[clap(name = "run", about = "Start the ingestion supervisor: catch-up backfill, then live subscription and health monitoring.")]
    Run(RunArgs),
    #[clap(name = "backfill", about = "Backfill an explicit block range.")]
    Backfill(BackfillArgs),
    #[clap(name = "state", about = "Print the reconstructed state snapshot at a given block, as JSON.")]
    State(StateArgs),
    #[clap(name = "events", about = "List persisted events.")]
    Events(EventsArgs),
}

#[derive(Debug, Parser)]
pub(crate) struct RunArgs {}

#[derive(Debug, Parser)]
pub(crate) struct BackfillArgs {
    /// Inclusive first block of the range to backfill.
    #[clap(long)]
    pub(crate) from_block: u64,

    /// Inclusive last block of the range to backfill. Defaults to the chain tip.
    #[clap(long)]
    pub(crate) to_block: Option<u64>,
}

#[derive(Debug, Parser)]
pub(crate) struct StateArgs {
    /// The block height to reconstruct state at.
    #[clap(long)]
    pub(crate) block: u64,

    /// Restrict the snapshot to one player's state plus their token/NFT
    /// holdings, instead of printing the full snapshot.
    #[clap(long)]
    pub(crate) player: Option<String>,
}

#[derive(Debug, Parser)]
pub(crate) struct EventsArgs {
    /// Filter by contract name or address.
    #[clap(long)]
    pub(crate) contract: Option<String>,

    /// Filter by event name.
    #[clap(long)]
    pub(crate) name: Option<String>,

    /// Maximum number of events to return, most recent first.
    #[clap(long, default_value_t = 200)]
    pub(crate) limit: i64,
}
