use alloy::providers::ProviderBuilder;
use indexer_common::IndexerError;
use indexer_config::Configuration;
use indexer_registry::ContractRegistry;
use indexer_store::LogStore;
use tracing::info;

use crate::{HealthMonitor, IngestionContext, LiveSubscriber};

/// Wires up the store, registry, and concurrent ingestion tasks, matching
/// the startup sequence in §4.7: open store, load registry (persisting its
/// catalog), catch up, then run live subscription and health monitoring
/// concurrently.
pub struct IngestionSupervisor {
    ctx: IngestionContext,
}

impl IngestionSupervisor {
    /// Opens the store, loads the contract registry, and persists its
    /// catalog — the shared setup every command surface needs before doing
    /// anything else.
    pub async fn bootstrap(config: Configuration) -> Result<Self, IndexerError> {
        let store = LogStore::open(&config.db_path).await?;
        let registry = ContractRegistry::load(&config)?;

        for contract in registry.contracts() {
            store
                .upsert_contract(
                    &format!("{:#x}", contract.address),
                    &contract.name,
                    contract.abi_hash.as_deref(),
                    None,
                )
                .await?;
        }

        Ok(Self {
            ctx: IngestionContext::new(config, store, registry),
        })
    }

    pub fn context(&self) -> &IngestionContext {
        &self.ctx
    }

    /// Runs the full ingestion pipeline: initial catch-up, then live
    /// subscription and health monitoring concurrently, forever.
    pub async fn start(&self) -> Result<(), IndexerError> {
        let http_url = self.ctx.config.require_rpc_http()?;
        let http_provider = ProviderBuilder::new()
            .on_builtin(http_url)
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;

        let backfill = crate::BackfillEngine::new(self.ctx.clone(), http_provider.clone());
        info!("running initial catch-up backfill");
        backfill.backfill_missed_blocks().await?;

        let live = LiveSubscriber::new(self.ctx.clone(), http_provider.clone());
        let health = HealthMonitor::new(self.ctx.clone(), http_provider);

        tokio::select! {
            result = live.run() => result,
            () = health.run() => Ok(()),
        }
    }

    /// Runs an explicit backfill over `[from_block, to_block]`, defaulting
    /// `to_block` to the current chain tip.
    pub async fn backfill(&self, from_block: u64, to_block: Option<u64>) -> Result<(), IndexerError> {
        let http_url = self.ctx.config.require_rpc_http()?;
        let provider = ProviderBuilder::new()
            .on_builtin(http_url)
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;

        let to_block = match to_block {
            Some(to_block) => to_block,
            None => {
                use alloy::providers::Provider;
                provider
                    .get_block_number()
                    .await
                    .map_err(|e| IndexerError::Rpc(e.to_string()))?
            }
        };

        let backfill = crate::BackfillEngine::new(self.ctx.clone(), provider);
        backfill.backfill_range(from_block, to_block).await
    }
}
