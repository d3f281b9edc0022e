use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// The full reconstructed state at some block height (§4.8): a deterministic
/// left-fold over persisted events, independent of ingestion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub game: GameState,
    /// Keyed by lower-cased `0x` address.
    pub players: HashMap<String, PlayerState>,
    /// Keyed by lower-cased `0x` contract address.
    pub tokens: HashMap<String, TokenState>,
    /// Keyed by lower-cased `0x` contract address.
    pub nfts: HashMap<String, NftState>,
    /// Keyed by token id, as a decimal string.
    pub gamepieces: HashMap<String, Gamepiece>,
    /// `trait_counts[i][v]` = count of minted gamepieces whose trait slot
    /// `i` (0..4) has value `v` (0..4).
    pub trait_counts: [[u64; 4]; 4],
    pub events: EventCounts,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GameState {
    pub phase: Option<JsonValue>,
    pub level: Option<JsonValue>,
    pub prize_pools: PrizePools,
    pub last_event_block: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PrizePools {
    pub current: u128,
    pub future: u128,
    pub next: u128,
    pub baf: u128,
    pub decimator: u128,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerState {
    pub eth_deposited: u128,
    pub tickets_current: u128,
    pub tickets_future: u128,
    pub affiliate: Option<AffiliateInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AffiliateInfo {
    pub code: Option<String>,
    pub upline: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenState {
    /// The contract's registered name, if known to the contract catalog.
    pub name: Option<String>,
    /// Keyed by lower-cased `0x` address. The zero address is never a key.
    pub balances: HashMap<String, u128>,
    pub total_supply: u128,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NftState {
    /// The contract's registered name, if known to the contract catalog.
    pub name: Option<String>,
    /// Token id (decimal string) to current owner. A burned or never-minted
    /// token has no entry.
    pub owners: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Gamepiece {
    pub owner: String,
    pub traits: Vec<u64>,
    pub burned: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventCounts {
    pub counts: HashMap<String, u64>,
}

/// A player-restricted projection of a [`Snapshot`]: the player's own state
/// plus per-token and per-NFT holdings, returned by
/// [`crate::StateReconstructor::player_state`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerSnapshot {
    pub player: PlayerState,
    /// Per-contract balance, only present for contracts where this address
    /// holds a non-zero balance.
    pub token_balances: HashMap<String, u128>,
    /// Per-contract list of owned token ids.
    pub owned_nfts: HashMap<String, Vec<String>>,
}
