//! Indexer CLI: ingests EVM contract events into a local store and
//! reconstructs protocol state from them.

pub(crate) mod args;
pub(crate) mod log_args;

use std::path::Path;

use args::{Arguments, EventsArgs, StateArgs, Subcommands};
use clap::Parser;
use eyre::Result;
use indexer_config::Configuration;
use indexer_ingest::{IngestionContext, IngestionSupervisor};
use indexer_registry::ContractRegistry;
use indexer_state::StateReconstructor;
use indexer_store::LogStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse();

    // init tracing
    let _guard = args.logs.init_tracing()?;

    let config = Configuration::load(Path::new(&args.config))?;

    match args.sub {
        Subcommands::Run(_) => {
            let supervisor = IngestionSupervisor::bootstrap(config).await?;
            supervisor.start().await?
        }
        Subcommands::Backfill(subargs) => {
            let supervisor = IngestionSupervisor::bootstrap(config).await?;
            supervisor.backfill(subargs.from_block, subargs.to_block).await?;
        }
        Subcommands::State(subargs) => print_state(config, subargs).await?,
        Subcommands::Events(subargs) => print_events(config, subargs).await?,
    };

    Ok(())
}

/// Opens the store and registry directly, without the full
/// [`IngestionSupervisor`] bootstrap — read-only queries need neither a
/// live RPC connection nor the contract-catalog upsert that bootstrap
/// performs on every ingestion startup.
async fn open_read_only(config: Configuration) -> Result<IngestionContext> {
    let store = LogStore::open(&config.db_path).await?;
    let registry = ContractRegistry::load(&config)?;
    Ok(IngestionContext::new(config, store, registry))
}

async fn print_state(config: Configuration, args: StateArgs) -> Result<()> {
    let ctx = open_read_only(config).await?;
    let reconstructor = StateReconstructor::new(&ctx.store);

    let json = match args.player {
        Some(player) => {
            let address = resolve_address(&ctx, &player);
            serde_json::to_value(reconstructor.player_state(&address, args.block).await?)?
        }
        None => serde_json::to_value(reconstructor.at_block(args.block).await?)?,
    };

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn print_events(config: Configuration, args: EventsArgs) -> Result<()> {
    let ctx = open_read_only(config).await?;
    let contract = args.contract.as_deref().map(|c| resolve_address(&ctx, c));

    let events = ctx
        .store
        .query_events(contract.as_deref(), args.name.as_deref(), args.limit)
        .await?;

    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}

/// Accepts either a configured contract name or a literal `0x` address,
/// lower-casing either way to match the store's persisted key format.
fn resolve_address(ctx: &IngestionContext, name_or_addr: &str) -> String {
    if let Some(contract) = ctx.registry.by_name(name_or_addr) {
        format!("{:#x}", contract.address)
    } else {
        name_or_addr.to_ascii_lowercase()
    }
}
