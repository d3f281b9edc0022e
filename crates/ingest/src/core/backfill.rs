use std::sync::atomic::{AtomicU64, Ordering};

use alloy::{
    primitives::Address,
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
    transports::BoxTransport,
};
use indexer_common::{IndexerError, RangeTooLargeError};
use indexer_decode::{decode_log as dispatch_decode, raw_data_hex, DecodedEvent};
use indexer_store::PendingEvent;
use tracing::warn;

use crate::{normalize_log, IngestionContext};

/// Windowed `eth_getLogs` backfill with adaptive batch-size halving on
/// "range too large" provider errors (§4.4).
pub struct BackfillEngine {
    ctx: IngestionContext,
    provider: RootProvider<BoxTransport>,
    batch_size: AtomicU64,
}

impl BackfillEngine {
    pub fn new(ctx: IngestionContext, provider: RootProvider<BoxTransport>) -> Self {
        let batch_size = ctx.config.batch_size();
        Self {
            ctx,
            provider,
            batch_size: AtomicU64::new(batch_size),
        }
    }

    /// Backfills `[from_block, to_block]` inclusive, windowed by the
    /// current batch size. On a "range too large"-shaped provider error the
    /// window is halved and retried; at batch size 1 the error is fatal.
    pub async fn backfill_range(&self, from_block: u64, to_block: u64) -> Result<(), IndexerError> {
        if from_block > to_block {
            return Ok(());
        }

        let addresses: Vec<Address> = self.ctx.registry.addresses();
        let mut current = from_block;

        while current <= to_block {
            let batch_size = self.batch_size.load(Ordering::Relaxed).max(1);
            let batch_to = current.saturating_add(batch_size - 1).min(to_block);

            let filter = Filter::new()
                .address(addresses.clone())
                .from_block(current)
                .to_block(batch_to);

            let mut logs = match self.provider.get_logs(&filter).await {
                Ok(logs) => logs,
                Err(err) => {
                    let range_too_large = is_range_too_large_error(&err.to_string());

                    if !range_too_large {
                        return Err(IndexerError::Rpc(err.to_string()));
                    }
                    if batch_size <= 1 {
                        return Err(RangeTooLargeError::Unrecoverable { block: current }.into());
                    }

                    let shrunk = (batch_size / 2).max(1);
                    self.batch_size.store(shrunk, Ordering::Relaxed);
                    warn!(
                        from = current,
                        to = batch_to,
                        new_batch_size = shrunk,
                        "log query range too large, shrinking batch size"
                    );
                    continue;
                }
            };

            logs.sort_by_key(|log| (log.block_number.unwrap_or(0), log.log_index.unwrap_or(0)));

            let pending = self.decode_logs(&logs).await;

            let provider = self.provider.clone();
            let timestamp = self
                .ctx
                .block_time_cache
                .get_or_fetch(batch_to, |block| async move {
                    fetch_block_timestamp(&provider, block).await
                })
                .await
                .ok();

            {
                let _write_guard = self.ctx.write_lock.lock().await;
                self.ctx.store.insert_batch(&pending, batch_to, timestamp).await?;
            }

            current = batch_to + 1;
        }

        Ok(())
    }

    /// Backfills the gap between the persisted cursor and the chain tip.
    /// A no-op if the cursor has already caught up.
    pub async fn backfill_missed_blocks(&self) -> Result<(), IndexerError> {
        let tip = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;
        let cursor = self.ctx.store.read_cursor(self.ctx.config.start_block).await?;
        let from = (cursor + 1).max(self.ctx.config.start_block as i64) as u64;

        if from > tip {
            return Ok(());
        }

        self.backfill_range(from, tip).await
    }

    /// Decodes each log and resolves its own block's timestamp (not the
    /// batch's), matching the Python reference's per-log resolution even in
    /// its batch path.
    async fn decode_logs(&self, logs: &[Log]) -> Vec<PendingEvent> {
        let mut pending = Vec::with_capacity(logs.len());

        for log in logs {
            let Some(normalized) = normalize_log(log) else {
                warn!("skipping log missing block number or log index during backfill");
                continue;
            };

            let decoded = match self.ctx.registry.by_address(&normalized.address) {
                Some(contract) => {
                    dispatch_decode(&normalized, &contract.topic_to_event, &contract.events)
                }
                None => DecodedEvent::unknown(normalized.topic0().map(|t| format!("{t:#x}"))),
            };

            let provider = self.provider.clone();
            let block_number = normalized.block_number;
            let timestamp = self
                .ctx
                .block_time_cache
                .get_or_fetch(block_number, |block| async move {
                    fetch_block_timestamp(&provider, block).await
                })
                .await
                .ok();

            pending.push(PendingEvent {
                block_number: normalized.block_number,
                block_timestamp: timestamp,
                transaction_hash: normalized.transaction_hash_key(),
                transaction_index: normalized.transaction_index,
                log_index: normalized.log_index,
                contract_address: normalized.address_key(),
                raw_data: raw_data_hex(&normalized.data),
                decoded,
            });
        }

        pending
    }
}

/// Matches the provider error shapes that mean "the requested block range
/// returned too many logs", per the Python reference's substring check.
fn is_range_too_large_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("query returned more than") || message.contains("too many")
}

async fn fetch_block_timestamp(
    provider: &RootProvider<BoxTransport>,
    block: u64,
) -> Result<u64, IndexerError> {
    let block = provider
        .get_block_by_number(block.into(), false)
        .await
        .map_err(|e| IndexerError::Rpc(e.to_string()))?
        .ok_or_else(|| IndexerError::Rpc(format!("block {block} not found")))?;

    Ok(block.header.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_geth_and_infura_range_errors() {
        assert!(is_range_too_large_error(
            "eth_getLogs query returned more than 10000 results"
        ));
        assert!(is_range_too_large_error("too many results for this query"));
        assert!(is_range_too_large_error(
            "Query Returned More Than 10000 Results"
        ));
    }

    #[test]
    fn leaves_unrelated_errors_unmatched() {
        assert!(!is_range_too_large_error("connection refused"));
        assert!(!is_range_too_large_error("execution reverted"));
    }
}
