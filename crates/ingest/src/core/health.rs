use std::time::Duration;

use alloy::{
    providers::{Provider, RootProvider},
    transports::BoxTransport,
};
use tracing::warn;

use crate::{BackfillEngine, IngestionContext};

/// Periodically checks the backfill cursor against the chain tip and
/// triggers catch-up backfill when the indexer has fallen behind (§4.6).
///
/// Every error is logged and swallowed — this loop never terminates and
/// never propagates a failure to the supervisor.
pub struct HealthMonitor {
    ctx: IngestionContext,
    http_provider: RootProvider<BoxTransport>,
}

impl HealthMonitor {
    pub fn new(ctx: IngestionContext, http_provider: RootProvider<BoxTransport>) -> Self {
        Self { ctx, http_provider }
    }

    pub async fn run(&self) {
        let backfill = BackfillEngine::new(self.ctx.clone(), self.http_provider.clone());
        let interval = Duration::from_secs(self.ctx.config.health_check_interval_secs());
        let threshold = self.ctx.config.health_check_threshold() as i64;

        loop {
            tokio::time::sleep(interval).await;

            if let Err(err) = self.tick(&backfill, threshold).await {
                warn!(%err, "health check failed");
            }
        }
    }

    async fn tick(
        &self,
        backfill: &BackfillEngine,
        threshold: i64,
    ) -> Result<(), indexer_common::IndexerError> {
        let tip = self
            .http_provider
            .get_block_number()
            .await
            .map_err(|e| indexer_common::IndexerError::Rpc(e.to_string()))?;
        let cursor = self.ctx.store.read_cursor(self.ctx.config.start_block).await?;

        if tip as i64 > cursor + threshold {
            backfill.backfill_missed_blocks().await?;
        }

        Ok(())
    }
}
