use std::time::Duration;

use alloy::{
    primitives::Address,
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::Filter,
    transports::BoxTransport,
};
use futures::StreamExt;
use indexer_common::IndexerError;
use indexer_decode::{decode_log as dispatch_decode, raw_data_hex, DecodedEvent};
use indexer_store::PendingEvent;
use tracing::{debug, warn};

use crate::{normalize_log, BackfillEngine, IngestionContext};

const MAX_BACKOFF_SECS: u64 = 60;

/// Live log subscription over websocket, with gap-healing catch-up and
/// exponential-backoff reconnect (§4.5).
pub struct LiveSubscriber {
    ctx: IngestionContext,
    http_provider: RootProvider<BoxTransport>,
}

impl LiveSubscriber {
    pub fn new(ctx: IngestionContext, http_provider: RootProvider<BoxTransport>) -> Self {
        Self { ctx, http_provider }
    }

    /// Runs the reconnect loop forever. Returns only on a fatal
    /// configuration error (missing `rpc_ws`).
    pub async fn run(&self) -> Result<(), IndexerError> {
        let ws_url = self.ctx.config.require_rpc_ws()?.to_string();
        let addresses: Vec<Address> = self.ctx.registry.addresses();
        let backfill = BackfillEngine::new(self.ctx.clone(), self.http_provider.clone());

        let initial_backoff = self.ctx.config.reconnect_delay_secs().max(1);
        let mut backoff = initial_backoff;

        loop {
            if let Err(err) = backfill.backfill_missed_blocks().await {
                warn!(%err, "catch-up backfill before subscribe failed");
            }

            match self
                .subscribe_once(&ws_url, &addresses, &backfill, initial_backoff, &mut backoff)
                .await
            {
                Ok(()) => warn!("live subscription stream ended"),
                Err(err) => warn!(%err, "live subscription failed"),
            }

            warn!(backoff_secs = backoff, "reconnecting to live subscription");
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
        }
    }

    /// Opens one subscription and consumes its stream until it ends or
    /// errors. Resets `backoff` to `initial_backoff` as soon as the
    /// subscription is established, per §4.5.
    async fn subscribe_once(
        &self,
        ws_url: &str,
        addresses: &[Address],
        backfill: &BackfillEngine,
        initial_backoff: u64,
        backoff: &mut u64,
    ) -> Result<(), IndexerError> {
        let provider = ProviderBuilder::new()
            .on_builtin(ws_url)
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;

        let filter = Filter::new().address(addresses.to_vec());
        let subscription = provider
            .subscribe_logs(&filter)
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;
        debug!("subscribed to logs");
        *backoff = initial_backoff;

        let mut stream = subscription.into_stream();

        while let Some(log) = stream.next().await {
            let Some(normalized) = normalize_log(&log) else {
                warn!("skipping live log missing block number or log index");
                continue;
            };

            if normalized.is_removed() {
                self.ctx
                    .store
                    .delete_log(&normalized.transaction_hash_key(), normalized.log_index)
                    .await?;
                continue;
            }

            let cursor = self.ctx.store.read_cursor(self.ctx.config.start_block).await?;
            let next_expected = (cursor + 1) as u64;
            if normalized.block_number > next_expected {
                backfill
                    .backfill_range(next_expected, normalized.block_number - 1)
                    .await?;
            }

            self.process_log(&normalized).await?;
        }

        Ok(())
    }

    async fn process_log(&self, normalized: &indexer_common::NormalizedLog) -> Result<(), IndexerError> {
        let decoded = match self.ctx.registry.by_address(&normalized.address) {
            Some(contract) => dispatch_decode(normalized, &contract.topic_to_event, &contract.events),
            None => DecodedEvent::unknown(normalized.topic0().map(|t| format!("{t:#x}"))),
        };

        let provider = self.http_provider.clone();
        let block_number = normalized.block_number;
        let timestamp = self
            .ctx
            .block_time_cache
            .get_or_fetch(block_number, |block| async move {
                let block = provider
                    .get_block_by_number(block.into(), false)
                    .await
                    .map_err(|e| IndexerError::Rpc(e.to_string()))?
                    .ok_or_else(|| IndexerError::Rpc(format!("block {block} not found")))?;
                Ok::<_, IndexerError>(block.header.timestamp)
            })
            .await
            .ok();

        let pending = PendingEvent {
            block_number: normalized.block_number,
            block_timestamp: timestamp,
            transaction_hash: normalized.transaction_hash_key(),
            transaction_index: normalized.transaction_index,
            log_index: normalized.log_index,
            contract_address: normalized.address_key(),
            raw_data: raw_data_hex(&normalized.data),
            decoded,
        };

        let _write_guard = self.ctx.write_lock.lock().await;
        self.ctx
            .store
            .insert_batch(&[pending], normalized.block_number, timestamp)
            .await?;

        Ok(())
    }
}
