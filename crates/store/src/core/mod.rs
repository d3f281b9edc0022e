use std::str::FromStr;

use indexer_common::StoreError;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use tracing::debug;

use crate::{EventRecord, PendingEvent};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_number INTEGER NOT NULL,
    block_timestamp INTEGER,
    transaction_hash TEXT NOT NULL,
    transaction_index INTEGER,
    log_index INTEGER NOT NULL,
    contract_address TEXT NOT NULL,
    event_name TEXT NOT NULL,
    event_signature TEXT,
    raw_data TEXT,
    decoded_args TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(transaction_hash, log_index)
);
CREATE INDEX IF NOT EXISTS idx_events_block ON events(block_number);
CREATE INDEX IF NOT EXISTS idx_events_contract ON events(contract_address);
CREATE INDEX IF NOT EXISTS idx_events_name ON events(event_name);
CREATE INDEX IF NOT EXISTS idx_events_contract_block ON events(contract_address, block_number);

CREATE TABLE IF NOT EXISTS sync_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_processed_block INTEGER NOT NULL,
    last_processed_timestamp INTEGER,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS contracts (
    address TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    abi_hash TEXT,
    deployed_block INTEGER
);

CREATE TABLE IF NOT EXISTS event_indexed_args (
    transaction_hash TEXT NOT NULL,
    log_index INTEGER NOT NULL,
    arg_name TEXT NOT NULL,
    arg_value TEXT,
    contract_address TEXT,
    event_name TEXT,
    block_number INTEGER,
    PRIMARY KEY (transaction_hash, log_index, arg_name)
);
CREATE INDEX IF NOT EXISTS idx_event_indexed_args_name_value ON event_indexed_args(arg_name, arg_value);
CREATE INDEX IF NOT EXISTS idx_event_indexed_args_contract ON event_indexed_args(contract_address);
"#;

/// Durable, idempotent storage for decoded events and the ingestion cursor.
///
/// A single `SqlitePool` is shared by every caller; write operations (batch
/// insert, cursor advance, log deletion) are serialized by the ingestion
/// supervisor's write lock, not by this type — `LogStore` itself is just the
/// SQL boundary (§4.3, §5).
#[derive(Debug, Clone)]
pub struct LogStore {
    pool: SqlitePool,
}

impl LogStore {
    /// Opens (creating if missing) the SQLite database at `db_path`, enables
    /// WAL mode, and ensures the schema exists.
    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(db_path)
            .map_err(|e| StoreError::backend("parse database path", e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::backend("connect", e))?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(|e| StoreError::backend("set journal_mode", e))?;

        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| StoreError::backend("apply schema", e))?;
        }

        debug!(db_path, "opened log store");
        Ok(Self { pool })
    }

    /// In-memory store for tests, still applying the full schema.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:").await
    }

    /// Inserts a batch of decoded events and advances the sync cursor, all
    /// within one transaction. A failure on any row rolls the whole batch
    /// back — the cursor does not move (§7's `StoreError` contract).
    pub async fn insert_batch(
        &self,
        events: &[PendingEvent],
        cursor_block: u64,
        cursor_timestamp: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend("begin transaction", e))?;

        for event in events {
            let decoded_args = event.decoded_args_json();

            sqlx::query(
                "INSERT OR IGNORE INTO events (
                    block_number, block_timestamp, transaction_hash, transaction_index,
                    log_index, contract_address, event_name, event_signature, raw_data, decoded_args
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(event.block_number as i64)
            .bind(event.block_timestamp.map(|t| t as i64))
            .bind(&event.transaction_hash)
            .bind(event.transaction_index.map(|t| t as i64))
            .bind(event.log_index as i64)
            .bind(&event.contract_address)
            .bind(&event.decoded.event_name)
            .bind(&event.decoded.event_signature)
            .bind(&event.raw_data)
            .bind(&decoded_args)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::backend("insert event", e))?;

            for (arg_name, arg_value) in event.decoded.indexed_args.iter() {
                sqlx::query(
                    "INSERT OR IGNORE INTO event_indexed_args (
                        transaction_hash, log_index, arg_name, arg_value,
                        contract_address, event_name, block_number
                    ) VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&event.transaction_hash)
                .bind(event.log_index as i64)
                .bind(arg_name)
                .bind(arg_value.to_indexed_string())
                .bind(&event.contract_address)
                .bind(&event.decoded.event_name)
                .bind(event.block_number as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::backend("insert indexed arg", e))?;
            }
        }

        self.advance_cursor(&mut tx, cursor_block as i64, cursor_timestamp.map(|t| t as i64))
            .await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::backend("commit batch", e))?;

        Ok(())
    }

    async fn advance_cursor(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        block: i64,
        timestamp: Option<i64>,
    ) -> Result<(), StoreError> {
        let current: Option<i64> =
            sqlx::query_scalar("SELECT last_processed_block FROM sync_state WHERE id = 1")
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| StoreError::backend("read cursor", e))?;

        if let Some(current) = current {
            if block < current {
                // Silent no-op: the cursor is read unlocked by concurrent
                // readers (backfill and live catch-up can race), so an
                // out-of-order advance here is a normal occurrence, not an
                // error.
                return Ok(());
            }
        }

        sqlx::query(
            "INSERT INTO sync_state (id, last_processed_block, last_processed_timestamp)
             VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                last_processed_block = excluded.last_processed_block,
                last_processed_timestamp = excluded.last_processed_timestamp,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(block)
        .bind(timestamp)
        .execute(&mut **tx)
        .await
        .map_err(|e| StoreError::backend("advance cursor", e))?;

        Ok(())
    }

    /// Removes a single log, keyed by `(transaction_hash, log_index)` — the
    /// response to a `removed: true` reorg notification. Not an error path;
    /// callers invoke this as a plain method (§7).
    pub async fn delete_log(&self, transaction_hash: &str, log_index: u32) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend("begin transaction", e))?;

        sqlx::query("DELETE FROM events WHERE transaction_hash = ? AND log_index = ?")
            .bind(transaction_hash)
            .bind(log_index as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::backend("delete event", e))?;

        sqlx::query(
            "DELETE FROM event_indexed_args WHERE transaction_hash = ? AND log_index = ?",
        )
        .bind(transaction_hash)
        .bind(log_index as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::backend("delete indexed args", e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::backend("commit deletion", e))?;

        Ok(())
    }

    /// Reads the persisted cursor, or the implied initial value
    /// `max(start_block - 1, 0)` when `sync_state` has no row yet.
    pub async fn read_cursor(&self, start_block: u64) -> Result<i64, StoreError> {
        let current: Option<i64> =
            sqlx::query_scalar("SELECT last_processed_block FROM sync_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::backend("read cursor", e))?;

        Ok(current.unwrap_or_else(|| start_block.saturating_sub(1) as i64))
    }

    /// Upserts a contract's catalog entry (address, name, ABI hash,
    /// deployed block), called once per contract on every registry load.
    pub async fn upsert_contract(
        &self,
        address: &str,
        name: &str,
        abi_hash: Option<&str>,
        deployed_block: Option<u64>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO contracts (address, name, abi_hash, deployed_block)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(address) DO UPDATE SET
                name = excluded.name,
                abi_hash = excluded.abi_hash,
                deployed_block = excluded.deployed_block",
        )
        .bind(address)
        .bind(name)
        .bind(abi_hash)
        .bind(deployed_block.map(|b| b as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::backend("upsert contract", e))?;

        Ok(())
    }

    /// The contract catalog's address-to-name mapping, keyed by lower-cased
    /// `0x` address, used to label per-contract state by name rather than
    /// raw address alone.
    pub async fn contract_names(&self) -> Result<std::collections::HashMap<String, String>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT address, name FROM contracts")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::backend("read contract names", e))?;

        Ok(rows.into_iter().collect())
    }

    /// All events at or below `upto_block`, ordered `(block_number ASC,
    /// log_index ASC)` — the order the state reconstructor folds over.
    pub async fn iter_events(&self, upto_block: u64) -> Result<Vec<EventRecord>, StoreError> {
        sqlx::query_as::<_, EventRecord>(
            "SELECT id, block_number, block_timestamp, transaction_hash, transaction_index,
                    log_index, contract_address, event_name, event_signature, raw_data, decoded_args
             FROM events
             WHERE block_number <= ?
             ORDER BY block_number ASC, log_index ASC",
        )
        .bind(upto_block as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::backend("iterate events", e))
    }

    /// Events matching the given filters, newest first, for the `events`
    /// CLI command.
    pub async fn query_events(
        &self,
        contract: Option<&str>,
        name: Option<&str>,
        limit: i64,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let mut sql = String::from(
            "SELECT id, block_number, block_timestamp, transaction_hash, transaction_index,
                    log_index, contract_address, event_name, event_signature, raw_data, decoded_args
             FROM events WHERE 1 = 1",
        );
        if contract.is_some() {
            sql.push_str(" AND contract_address = ?");
        }
        if name.is_some() {
            sql.push_str(" AND event_name = ?");
        }
        sql.push_str(" ORDER BY block_number DESC, log_index DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, EventRecord>(&sql);
        if let Some(contract) = contract {
            query = query.bind(contract);
        }
        if let Some(name) = name {
            query = query.bind(name);
        }
        query = query.bind(limit);

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::backend("query events", e))
    }

    /// Row count in `events`, used by tests to assert idempotent inserts.
    #[cfg(test)]
    async fn event_count(&self) -> i64 {
        sqlx::query("SELECT COUNT(*) AS c FROM events")
            .fetch_one(&self.pool)
            .await
            .unwrap()
            .get("c")
    }
}

#[cfg(test)]
mod tests {
    use indexer_decode::{DecodedArgs, DecodedEvent};

    use super::*;

    fn sample_event(tx_hash: &str, log_index: u32, block: u64) -> PendingEvent {
        PendingEvent {
            block_number: block,
            block_timestamp: Some(1_700_000_000),
            transaction_hash: tx_hash.to_string(),
            transaction_index: Some(0),
            log_index,
            contract_address: "0x1111111111111111111111111111111111111111".to_string(),
            raw_data: None,
            decoded: DecodedEvent {
                event_name: "Transfer".to_string(),
                args: DecodedArgs::default(),
                event_signature: Some("0xddf2..".to_string()),
                indexed_args: DecodedArgs::default(),
            },
        }
    }

    #[tokio::test]
    async fn insert_batch_is_idempotent() {
        let store = LogStore::open_in_memory().await.unwrap();
        let event = sample_event("0xabc", 0, 10);

        store.insert_batch(&[event.clone()], 10, Some(1_700_000_000)).await.unwrap();
        store.insert_batch(&[event], 10, Some(1_700_000_000)).await.unwrap();

        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn cursor_defaults_to_start_block_minus_one() {
        let store = LogStore::open_in_memory().await.unwrap();
        assert_eq!(store.read_cursor(100).await.unwrap(), 99);
        assert_eq!(store.read_cursor(0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cursor_ignores_backwards_moves() {
        let store = LogStore::open_in_memory().await.unwrap();
        store.insert_batch(&[], 50, None).await.unwrap();

        store.insert_batch(&[], 10, None).await.unwrap();
        assert_eq!(store.read_cursor(0).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn delete_log_removes_event_and_indexed_args() {
        let store = LogStore::open_in_memory().await.unwrap();
        let event = sample_event("0xdef", 1, 20);
        store.insert_batch(&[event], 20, None).await.unwrap();
        assert_eq!(store.event_count().await, 1);

        store.delete_log("0xdef", 1).await.unwrap();
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn iter_events_orders_ascending_by_block_then_log_index() {
        let store = LogStore::open_in_memory().await.unwrap();
        store
            .insert_batch(
                &[sample_event("0x1", 1, 10), sample_event("0x2", 0, 10), sample_event("0x3", 0, 5)],
                10,
                None,
            )
            .await
            .unwrap();

        let events = store.iter_events(100).await.unwrap();
        let ordering: Vec<(i64, i64)> = events.iter().map(|e| (e.block_number, e.log_index)).collect();
        assert_eq!(ordering, vec![(5, 0), (10, 0), (10, 1)]);
    }
}
