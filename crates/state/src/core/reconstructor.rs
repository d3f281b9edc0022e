use std::collections::HashMap;

use indexer_common::StoreError;
use indexer_store::LogStore;

use crate::{GameState, PlayerSnapshot, Snapshot};

use super::fold::fold;

/// Rebuilds state by replaying persisted events; owns no state of its own
/// between calls (§9: "no cache, and there does not need to be one for
/// correctness").
#[derive(Debug)]
pub struct StateReconstructor<'a> {
    store: &'a LogStore,
}

impl<'a> StateReconstructor<'a> {
    pub fn new(store: &'a LogStore) -> Self {
        Self { store }
    }

    /// Returns the snapshot deterministic in the stored event sequence up to
    /// and including `block`.
    pub async fn at_block(&self, block: u64) -> Result<Snapshot, StoreError> {
        let events = self.store.iter_events(block).await?;
        let contract_names = self.store.contract_names().await?;
        Ok(fold(&events, &contract_names))
    }

    /// `at_block(block)` restricted to `address`, plus per-token and
    /// per-NFT projections for that address.
    pub async fn player_state(&self, address: &str, block: u64) -> Result<PlayerSnapshot, StoreError> {
        let snapshot = self.at_block(block).await?;
        Ok(project_player(&snapshot, &address.to_ascii_lowercase()))
    }

    /// `at_block(block).game`.
    pub async fn game_state(&self, block: u64) -> Result<GameState, StoreError> {
        Ok(self.at_block(block).await?.game)
    }
}

fn project_player(snapshot: &Snapshot, address: &str) -> PlayerSnapshot {
    let player = snapshot.players.get(address).cloned().unwrap_or_default();

    let token_balances: HashMap<String, u128> = snapshot
        .tokens
        .iter()
        .filter_map(|(contract, token)| token.balances.get(address).map(|&bal| (contract.clone(), bal)))
        .collect();

    let owned_nfts: HashMap<String, Vec<String>> = snapshot
        .nfts
        .iter()
        .filter_map(|(contract, nft)| {
            let owned: Vec<String> = nft
                .owners
                .iter()
                .filter(|(_, owner)| owner.as_str() == address)
                .map(|(token_id, _)| token_id.clone())
                .collect();
            (!owned.is_empty()).then_some((contract.clone(), owned))
        })
        .collect();

    PlayerSnapshot {
        player,
        token_balances,
        owned_nfts,
    }
}

#[cfg(test)]
mod tests {
    use indexer_store::{LogStore, PendingEvent};
    use indexer_decode::DecodedEvent;

    use super::*;

    async fn store_with_transfer() -> LogStore {
        let store = LogStore::open_in_memory().await.unwrap();
        let decoded = DecodedEvent {
            event_name: "Transfer".to_string(),
            args: indexer_decode::DecodedArgs(vec![
                ("from".to_string(), indexer_decode::Value::Address(Default::default())),
                ("to".to_string(), indexer_decode::Value::String("0xaaaa000000000000000000000000000000000a".to_string())),
                ("value".to_string(), indexer_decode::Value::Uint(alloy::primitives::U256::from(100u64))),
            ]),
            event_signature: None,
            indexed_args: indexer_decode::DecodedArgs::default(),
        };
        let event = PendingEvent {
            block_number: 1,
            block_timestamp: None,
            transaction_hash: "0x1".to_string(),
            transaction_index: Some(0),
            log_index: 0,
            contract_address: "0xc".to_string(),
            raw_data: None,
            decoded,
        };
        store.insert_batch(&[event], 1, None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn at_block_reflects_persisted_transfer() {
        let store = store_with_transfer().await;
        let reconstructor = StateReconstructor::new(&store);

        let snapshot = reconstructor.at_block(1).await.unwrap();
        let token = snapshot.tokens.get("0xc").unwrap();
        assert_eq!(token.total_supply, 100);
    }

    #[tokio::test]
    async fn player_state_projects_token_balance() {
        let store = store_with_transfer().await;
        let reconstructor = StateReconstructor::new(&store);

        let player = reconstructor
            .player_state("0xaaaa000000000000000000000000000000000a", 1)
            .await
            .unwrap();
        assert_eq!(player.token_balances.get("0xc"), Some(&100));
    }
}
