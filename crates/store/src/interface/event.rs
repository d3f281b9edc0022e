use indexer_decode::DecodedEvent;
use serde::Serialize;

/// A persisted event row, as read back from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct EventRecord {
    /// Autoincrement primary key.
    pub id: i64,
    pub block_number: i64,
    pub block_timestamp: Option<i64>,
    pub transaction_hash: String,
    pub transaction_index: Option<i64>,
    pub log_index: i64,
    pub contract_address: String,
    pub event_name: String,
    pub event_signature: Option<String>,
    pub raw_data: Option<String>,
    /// `decoded_args`, as the JSON string stored on disk.
    pub decoded_args: Option<String>,
}

/// A decoded log plus the identifying fields needed to persist it, built by
/// the ingestion pipeline before handing a batch to `LogStore::insert_batch`.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub block_number: u64,
    pub block_timestamp: Option<u64>,
    pub transaction_hash: String,
    pub transaction_index: Option<u32>,
    pub log_index: u32,
    pub contract_address: String,
    pub raw_data: Option<String>,
    pub decoded: DecodedEvent,
}

impl PendingEvent {
    /// `decoded_args` serialized the way it is persisted: an ordered JSON
    /// object, or `None` for the `"Unknown"` fallback with no arguments.
    pub fn decoded_args_json(&self) -> Option<String> {
        if self.decoded.args.iter().next().is_none() {
            return None;
        }
        serde_json::to_string(&self.decoded.args).ok()
    }
}
