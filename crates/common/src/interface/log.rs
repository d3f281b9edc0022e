use alloy::primitives::{Address, Bytes, TxHash, B256};
use serde::{Deserialize, Serialize};

/// A log normalized to the internal contract used throughout the pipeline:
/// binary fields are fixed-length, integer fields are already parsed, and
/// the address is checksum-cased (the store layer lower-cases it on write).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedLog {
    /// The address that emitted the log, checksum-cased.
    pub address: Address,
    /// Topics, `topics[0]` is the event signature hash when present.
    pub topics: Vec<B256>,
    /// The ABI-encoded, non-indexed event data.
    pub data: Bytes,
    /// The block the log was included in.
    pub block_number: u64,
    /// The index of the transaction within the block, if known.
    pub transaction_index: Option<u32>,
    /// The index of the log within the block.
    pub log_index: u32,
    /// The hash of the transaction that emitted the log.
    pub transaction_hash: TxHash,
    /// Set by the node when a previously delivered log is no longer part of
    /// the canonical chain.
    pub removed: Option<bool>,
}

impl NormalizedLog {
    /// Returns `topics[0]`, the event selector, if present.
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }

    /// Lower-cased `0x`-prefixed hex of [`Self::address`], the canonical
    /// form used as a key in [`crate`]'s persistence layer.
    pub fn address_key(&self) -> String {
        format!("{:#x}", self.address)
    }

    /// Lower-cased `0x`-prefixed hex of the transaction hash.
    pub fn transaction_hash_key(&self) -> String {
        format!("{:#x}", self.transaction_hash)
    }

    /// Whether the node flagged this log as revoked by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}
