use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};

use indexer_store::EventRecord;

use crate::Snapshot;

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Left-folds a block-ordered event sequence into a [`Snapshot`], per the
/// handler table in §4.8. `events` must already be ordered
/// `(block_number ASC, log_index ASC)` — callers get this for free from
/// `LogStore::iter_events`. `contract_names` labels `tokens`/`nfts` entries
/// with their catalog name, keyed by lower-cased `0x` address, matching the
/// Python reference's `_load_contract_names()`.
pub(crate) fn fold(events: &[EventRecord], contract_names: &HashMap<String, String>) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for record in events {
        let args = parse_args(record.decoded_args.as_deref());

        route(&mut snapshot, record, &args, contract_names);
        apply_player_heuristics(&mut snapshot, &record.event_name, &args);

        *snapshot
            .events
            .counts
            .entry(record.event_name.clone())
            .or_insert(0) += 1;
        snapshot.game.last_event_block = Some(record.block_number as u64);
    }

    snapshot
}

fn parse_args(raw: Option<&str>) -> Map<String, JsonValue> {
    raw.and_then(|s| serde_json::from_str::<JsonValue>(s).ok())
        .and_then(|v| match v {
            JsonValue::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

fn route(
    snapshot: &mut Snapshot,
    record: &EventRecord,
    args: &Map<String, JsonValue>,
    contract_names: &HashMap<String, String>,
) {
    match record.event_name.as_str() {
        "PhaseAdvanced" => phase_advanced(snapshot, args),
        "LevelAdvanced" => level_advanced(snapshot, args),
        "PrizePoolUpdated" => prize_pool_updated(snapshot, args),
        "DailyJackpotPaid" | "LevelJackpotPaid" => jackpot_paid(snapshot, args),
        "BAFDistributed" => baf_distributed(snapshot, args),
        "DecimatorPaid" => decimator_paid(snapshot, args),
        "GamepieceMinted" => gamepiece_minted(snapshot, args),
        "GamepieceBurned" => gamepiece_burned(snapshot, args),
        "AffiliateRegistered" => affiliate_registered(snapshot, args),
        "Transfer" => transfer(snapshot, &record.contract_address, args, contract_names),
        _ => {}
    }
}

fn phase_advanced(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    if let Some(phase) = get_first(args, &["newPhase", "phase"]) {
        snapshot.game.phase = Some(phase.clone());
    }
}

fn level_advanced(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    if let Some(level) = get_first(args, &["newLevel", "level"]) {
        snapshot.game.level = Some(level.clone());
    }
}

/// Absolute assignment, per the resolved Open Question in §9: a
/// `PrizePoolUpdated` overrides rather than deltas the pool.
fn prize_pool_updated(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    let pools = &mut snapshot.game.prize_pools;
    if let Some(v) = args.get("current").and_then(json_as_u128) {
        pools.current = v;
    }
    if let Some(v) = args.get("future").and_then(json_as_u128) {
        pools.future = v;
    }
    if let Some(v) = args.get("next").and_then(json_as_u128) {
        pools.next = v;
    }
    if let Some(v) = args.get("baf").and_then(json_as_u128) {
        pools.baf = v;
    }
    if let Some(v) = args.get("decimator").and_then(json_as_u128) {
        pools.decimator = v;
    }
}

fn jackpot_paid(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    let amount = get_first(args, &["amount", "payout"])
        .and_then(json_as_u128)
        .unwrap_or(0);
    snapshot.game.prize_pools.current = snapshot.game.prize_pools.current.saturating_sub(amount);
}

fn baf_distributed(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    let amount = get_first(args, &["amount", "payout"])
        .and_then(json_as_u128)
        .unwrap_or(0);
    snapshot.game.prize_pools.baf = snapshot.game.prize_pools.baf.saturating_sub(amount);
}

fn decimator_paid(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    let amount = get_first(args, &["amount", "payout"])
        .and_then(json_as_u128)
        .unwrap_or(0);
    snapshot.game.prize_pools.decimator =
        snapshot.game.prize_pools.decimator.saturating_sub(amount);
}

fn gamepiece_minted(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    let Some(token_id) = args.get("tokenId").and_then(json_as_u128) else {
        return;
    };
    let owner = get_first(args, &["to", "owner"])
        .and_then(json_as_address_string)
        .unwrap_or_default();
    let traits: Vec<u64> = args
        .get("traits")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(json_as_u128)
                .map(|v| v as u64)
                .collect()
        })
        .unwrap_or_default();

    for (i, &v) in traits.iter().enumerate().take(4) {
        if (v as usize) < 4 {
            snapshot.trait_counts[i][v as usize] += 1;
        }
    }

    snapshot.gamepieces.insert(
        token_id.to_string(),
        crate::Gamepiece {
            owner,
            traits,
            burned: false,
        },
    );
}

fn gamepiece_burned(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    let Some(token_id) = args.get("tokenId").and_then(json_as_u128) else {
        return;
    };
    if let Some(piece) = snapshot.gamepieces.get_mut(&token_id.to_string()) {
        piece.burned = true;
    }
}

fn affiliate_registered(snapshot: &mut Snapshot, args: &Map<String, JsonValue>) {
    let Some(player) = first_player_address(args) else {
        return;
    };
    let code = args.get("code").map(json_value_to_string);
    let upline = get_first(args, &["upline"])
        .and_then(json_as_address_string)
        .or_else(|| args.get("upline").map(json_value_to_string));

    snapshot.players.entry(player).or_default().affiliate = Some(crate::AffiliateInfo {
        code,
        upline,
    });
}

/// Disambiguates ERC-20 from ERC-721 by argument shape, per §9's "Polymorphic
/// Transfer" design note, rather than any per-contract type registry.
fn transfer(
    snapshot: &mut Snapshot,
    contract_address: &str,
    args: &Map<String, JsonValue>,
    contract_names: &HashMap<String, String>,
) {
    let from = get_first(args, &["from"]).and_then(json_as_address_string);
    let to = get_first(args, &["to"]).and_then(json_as_address_string);
    let from_is_zero = from.as_deref().map(|a| a == ZERO_ADDRESS).unwrap_or(true);
    let to_is_zero = to.as_deref().map(|a| a == ZERO_ADDRESS).unwrap_or(true);

    if let Some(value) = args.get("value").and_then(json_as_u128) {
        let token = snapshot.tokens.entry(contract_address.to_string()).or_default();
        if token.name.is_none() {
            token.name = contract_names.get(contract_address).cloned();
        }

        if !from_is_zero {
            if let Some(from) = &from {
                let balance = token.balances.entry(from.clone()).or_insert(0);
                *balance = balance.saturating_sub(value);
            }
        }
        if !to_is_zero {
            if let Some(to) = &to {
                *token.balances.entry(to.clone()).or_insert(0) += value;
            }
        }
        if from_is_zero {
            token.total_supply = token.total_supply.saturating_add(value);
        }
        if to_is_zero {
            token.total_supply = token.total_supply.saturating_sub(value);
        }
    } else if let Some(token_id) = args.get("tokenId").and_then(json_as_u128) {
        let nft = snapshot.nfts.entry(contract_address.to_string()).or_default();
        if nft.name.is_none() {
            nft.name = contract_names.get(contract_address).cloned();
        }
        let token_id = token_id.to_string();

        if to_is_zero {
            nft.owners.remove(&token_id);
        } else if let Some(to) = to {
            nft.owners.insert(token_id, to);
        }
    }
}

/// Applied unconditionally after the event-specific handler above, per
/// §4.8: the heuristic runs even when the guessed player address belongs to
/// an unrelated sender, which can double-count. Preserved as specified.
fn apply_player_heuristics(snapshot: &mut Snapshot, event_name: &str, args: &Map<String, JsonValue>) {
    let Some(player) = first_player_address(args) else {
        return;
    };
    let entry = snapshot.players.entry(player).or_default();

    if matches!(event_name, "Deposit" | "Deposited") {
        if let Some(amount) = get_first(args, &["assets", "amount", "value"]).and_then(json_as_u128) {
            entry.eth_deposited = entry.eth_deposited.saturating_add(amount);
        }
    }
    if matches!(event_name, "Withdraw" | "Withdrawal" | "Withdrawn") {
        if let Some(amount) = get_first(args, &["assets", "amount", "value"]).and_then(json_as_u128) {
            entry.eth_deposited = entry.eth_deposited.saturating_sub(amount);
        }
    }
    if let Some(tickets) = args.get("tickets").and_then(json_as_u128) {
        entry.tickets_current = entry.tickets_current.saturating_add(tickets);
    }
    if let Some(future_tickets) = args.get("futureTickets").and_then(json_as_u128) {
        entry.tickets_future = entry.tickets_future.saturating_add(future_tickets);
    }
}

fn first_player_address(args: &Map<String, JsonValue>) -> Option<String> {
    const KEYS: [&str; 5] = ["player", "account", "owner", "sender", "to"];
    KEYS.iter()
        .find_map(|key| args.get(*key).and_then(json_as_address_string))
        .filter(|addr| addr != ZERO_ADDRESS)
}

fn get_first<'a>(args: &'a Map<String, JsonValue>, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter().find_map(|key| args.get(*key))
}

fn json_as_u128(value: &JsonValue) -> Option<u128> {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .map(u128::from)
            .or_else(|| n.as_i64().and_then(|v| u128::try_from(v).ok())),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_as_address_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if s.starts_with("0x") => Some(s.to_ascii_lowercase()),
        _ => None,
    }
}

fn json_value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event_name: &str, contract: &str, args: JsonValue, block: i64, log_index: i64) -> EventRecord {
        EventRecord {
            id: 0,
            block_number: block,
            block_timestamp: None,
            transaction_hash: format!("0x{block:064x}"),
            transaction_index: Some(0),
            log_index,
            contract_address: contract.to_string(),
            event_name: event_name.to_string(),
            event_signature: None,
            raw_data: None,
            decoded_args: Some(args.to_string()),
        }
    }

    #[test]
    fn erc20_round_trip_matches_supply_identity() {
        let events = vec![
            record(
                "Transfer",
                "0xc",
                serde_json::json!({"from": ZERO_ADDRESS, "to": "0xaaaa000000000000000000000000000000000a", "value": 100}),
                1,
                0,
            ),
            record(
                "Transfer",
                "0xc",
                serde_json::json!({"from": "0xaaaa000000000000000000000000000000000a", "to": "0xbbbb000000000000000000000000000000000b", "value": 30}),
                2,
                0,
            ),
            record(
                "Transfer",
                "0xc",
                serde_json::json!({"from": "0xbbbb000000000000000000000000000000000b", "to": ZERO_ADDRESS, "value": 10}),
                3,
                0,
            ),
        ];

        let snapshot = fold(&events, &HashMap::new());
        let token = snapshot.tokens.get("0xc").unwrap();

        assert_eq!(token.total_supply, 90);
        assert_eq!(token.balances.get("0xaaaa000000000000000000000000000000000a"), Some(&70));
        assert_eq!(token.balances.get("0xbbbb000000000000000000000000000000000b"), Some(&20));
        assert!(!token.balances.contains_key(ZERO_ADDRESS));
    }

    #[test]
    fn erc721_burn_removes_owner_entry() {
        let events = vec![
            record("Transfer", "0xc", serde_json::json!({"from": ZERO_ADDRESS, "to": "0xaaaa000000000000000000000000000000000a", "tokenId": 7}), 1, 0),
            record("Transfer", "0xc", serde_json::json!({"from": "0xaaaa000000000000000000000000000000000a", "to": "0xbbbb000000000000000000000000000000000b", "tokenId": 7}), 2, 0),
            record("Transfer", "0xc", serde_json::json!({"from": "0xbbbb000000000000000000000000000000000b", "to": ZERO_ADDRESS, "tokenId": 7}), 3, 0),
        ];

        let snapshot = fold(&events, &HashMap::new());
        let nft = snapshot.nfts.get("0xc").unwrap();
        assert!(!nft.owners.contains_key("7"));
    }

    #[test]
    fn gamepiece_traits_accumulate_per_slot() {
        let events = vec![
            record("GamepieceMinted", "0xc", serde_json::json!({"tokenId": 1, "to": "0xaaaa000000000000000000000000000000000a", "traits": [0, 2, 3, 1]}), 1, 0),
            record("GamepieceMinted", "0xc", serde_json::json!({"tokenId": 2, "to": "0xbbbb000000000000000000000000000000000b", "traits": [0, 0, 3, 1]}), 1, 1),
        ];

        let snapshot = fold(&events, &HashMap::new());
        assert_eq!(snapshot.trait_counts[0], [2, 0, 0, 0]);
        assert_eq!(snapshot.trait_counts[1], [1, 0, 1, 0]);
        assert_eq!(snapshot.trait_counts[2], [0, 0, 0, 2]);
        assert_eq!(snapshot.trait_counts[3], [0, 2, 0, 0]);
    }

    #[test]
    fn jackpot_subtraction_floors_at_zero() {
        let events = vec![
            record("PrizePoolUpdated", "0xc", serde_json::json!({"current": 50}), 1, 0),
            record("DailyJackpotPaid", "0xc", serde_json::json!({"amount": 70}), 2, 0),
        ];

        let snapshot = fold(&events, &HashMap::new());
        assert_eq!(snapshot.game.prize_pools.current, 0);
    }

    #[test]
    fn every_event_increments_counts_and_last_event_block() {
        let events = vec![
            record("PhaseAdvanced", "0xc", serde_json::json!({"newPhase": "Reveal"}), 5, 0),
            record("PhaseAdvanced", "0xc", serde_json::json!({"newPhase": "Claim"}), 6, 0),
        ];

        let snapshot = fold(&events, &HashMap::new());
        assert_eq!(snapshot.events.counts.get("PhaseAdvanced"), Some(&2));
        assert_eq!(snapshot.game.last_event_block, Some(6));
        assert_eq!(snapshot.game.phase, Some(serde_json::json!("Claim")));
    }

    #[test]
    fn player_heuristic_accumulates_tickets_and_deposits() {
        let events = vec![
            record("Deposit", "0xc", serde_json::json!({"sender": "0xaaaa000000000000000000000000000000000a", "amount": 5, "tickets": 2}), 1, 0),
            record("Withdraw", "0xc", serde_json::json!({"sender": "0xaaaa000000000000000000000000000000000a", "amount": 2}), 2, 0),
        ];

        let snapshot = fold(&events, &HashMap::new());
        let player = snapshot.players.get("0xaaaa000000000000000000000000000000000a").unwrap();
        assert_eq!(player.eth_deposited, 3);
        assert_eq!(player.tickets_current, 2);
    }

    #[test]
    fn token_and_nft_entries_pick_up_catalog_names() {
        let names: HashMap<String, String> = [
            ("0xc".to_string(), "GoldToken".to_string()),
            ("0xd".to_string(), "Gamepieces".to_string()),
        ]
        .into_iter()
        .collect();

        let events = vec![
            record("Transfer", "0xc", serde_json::json!({"from": ZERO_ADDRESS, "to": "0xaaaa000000000000000000000000000000000a", "value": 1}), 1, 0),
            record("Transfer", "0xd", serde_json::json!({"from": ZERO_ADDRESS, "to": "0xaaaa000000000000000000000000000000000a", "tokenId": 1}), 1, 1),
        ];

        let snapshot = fold(&events, &names);
        assert_eq!(snapshot.tokens.get("0xc").unwrap().name.as_deref(), Some("GoldToken"));
        assert_eq!(snapshot.nfts.get("0xd").unwrap().name.as_deref(), Some("Gamepieces"));
    }
}
