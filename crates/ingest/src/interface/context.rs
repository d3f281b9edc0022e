use std::sync::Arc;

use indexer_common::BlockTimeCache;
use indexer_config::Configuration;
use indexer_registry::ContractRegistry;
use indexer_store::LogStore;
use tokio::sync::Mutex;

/// Everything the ingestion tasks share: the store, the immutable contract
/// registry, the block-timestamp cache, and the write lock serializing
/// batch inserts (§5 — held only across "insert batch, advance cursor",
/// never across decode).
#[derive(Clone)]
pub struct IngestionContext {
    pub config: Arc<Configuration>,
    pub store: Arc<LogStore>,
    pub registry: Arc<ContractRegistry>,
    pub block_time_cache: Arc<BlockTimeCache>,
    pub write_lock: Arc<Mutex<()>>,
}

impl IngestionContext {
    pub fn new(config: Configuration, store: LogStore, registry: ContractRegistry) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            registry: Arc::new(registry),
            block_time_cache: Arc::new(BlockTimeCache::new()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}
