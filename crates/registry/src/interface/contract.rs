use std::collections::HashMap;

use alloy::primitives::{Address, B256};
use alloy_json_abi::Event;

/// One loaded contract: its address and the event ABIs known for it.
#[derive(Debug, Clone)]
pub struct LoadedContract {
    /// The configured name (config key), used for `--contract` lookups and
    /// the `contracts` catalog table.
    pub name: String,
    /// The contract's on-chain address.
    pub address: Address,
    /// All non-anonymous events, indexed by topic-0.
    pub topic_to_event: HashMap<B256, Event>,
    /// Every event for this address, including anonymous ones, in ABI
    /// declaration order — used for fallback decode.
    pub events: Vec<Event>,
    /// `sha256(canonical_json(abi))`, hex-encoded, used for change detection
    /// in the `contracts` catalog table. `None` when no ABI was resolved.
    pub abi_hash: Option<String>,
}
