use alloy::rpc::types::Log;
use indexer_common::NormalizedLog;

/// Converts an `alloy` RPC log into our internal representation, rejecting
/// the (pending-log) case where `block_number`/`log_index` are absent —
/// every finalized or reorg-signaling log the node hands us carries both.
pub(crate) fn normalize_log(log: &Log) -> Option<NormalizedLog> {
    Some(NormalizedLog {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        block_number: log.block_number?,
        transaction_index: log.transaction_index.map(|i| i as u32),
        log_index: log.log_index? as u32,
        transaction_hash: log.transaction_hash?,
        removed: Some(log.removed),
    })
}
