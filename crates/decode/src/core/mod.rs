use std::collections::HashMap;

use alloy::primitives::{Bytes, B256};
use alloy_dyn_abi::EventExt;
use alloy_json_abi::Event as EventAbi;
use indexer_common::NormalizedLog;
use tracing::warn;

use crate::{DecodedArgs, DecodedEvent, Value};

/// Decodes a normalized log against the ABIs known for its emitting
/// contract.
///
/// Implements spec.md §4.2's dispatch algorithm:
/// 1. If `topics[0]` has a registered entry, decode against it.
/// 2. Otherwise try every known event ABI for the address, keeping the
///    first successful decode.
/// 3. Otherwise yield the `"Unknown"` fallback.
///
/// Never returns an error: a decode failure against a matched ABI degrades
/// to `Unknown` rather than aborting ingestion (spec.md §7, DecodeError is
/// always swallowed here).
pub fn decode_log(
    log: &NormalizedLog,
    topic_to_abi: &HashMap<B256, EventAbi>,
    fallback_candidates: &[EventAbi],
) -> DecodedEvent {
    let topic0 = log.topic0();
    let topic0_hex = topic0.map(|t| format!("{t:#x}"));

    if let Some(topic0) = topic0 {
        if let Some(event_abi) = topic_to_abi.get(&topic0) {
            return decode_against(log, event_abi).unwrap_or_else(|reason| {
                warn!(
                    address = %log.address,
                    event = %event_abi.name,
                    reason,
                    "failed to decode matched log, downgrading to Unknown"
                );
                DecodedEvent::unknown(topic0_hex.clone())
            });
        }
    }

    for candidate in fallback_candidates {
        if let Ok(decoded) = decode_against(log, candidate) {
            return decoded;
        }
    }

    DecodedEvent::unknown(topic0_hex)
}

fn decode_against(log: &NormalizedLog, event_abi: &EventAbi) -> Result<DecodedEvent, String> {
    let log_data = alloy::primitives::LogData::new(log.topics.clone(), log.data.clone())
        .ok_or_else(|| "invalid log data (topic count/data length mismatch)".to_string())?;

    let decoded = event_abi
        .decode_log(&log_data, true)
        .map_err(|e| e.to_string())?;

    let mut args = Vec::with_capacity(event_abi.inputs.len());
    let mut indexed_args = Vec::with_capacity(event_abi.inputs.len());

    let mut indexed_values = decoded.indexed.iter();
    let mut body_values = decoded.body.iter();

    for input in &event_abi.inputs {
        if input.indexed {
            let Some(value) = indexed_values.next() else {
                continue;
            };
            let value = Value::from_dyn_sol_value(value);
            args.push((input.name.clone(), value.clone()));
            indexed_args.push((input.name.clone(), value));
        } else {
            let Some(value) = body_values.next() else {
                continue;
            };
            args.push((input.name.clone(), Value::from_dyn_sol_value(value)));
        }
    }

    Ok(DecodedEvent {
        event_name: event_abi.name.clone(),
        args: DecodedArgs(args),
        event_signature: Some(format!("{:#x}", event_abi.selector())),
        indexed_args: DecodedArgs(indexed_args),
    })
}

/// Hex-encodes the log's raw `data` field for the `raw_data` persisted
/// column, or `None` when empty (spec.md §3 marks it nullable).
pub fn raw_data_hex(data: &Bytes) -> Option<String> {
    if data.is_empty() {
        None
    } else {
        Some(format!("0x{}", hex::encode(data)))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{keccak256, Address, U256};
    use alloy_json_abi::EventParam;

    use super::*;

    fn transfer_event_abi() -> EventAbi {
        EventAbi {
            name: "Transfer".to_string(),
            inputs: vec![
                EventParam {
                    name: "from".to_string(),
                    ty: "address".to_string(),
                    indexed: true,
                    components: vec![],
                    internal_type: None,
                },
                EventParam {
                    name: "to".to_string(),
                    ty: "address".to_string(),
                    indexed: true,
                    components: vec![],
                    internal_type: None,
                },
                EventParam {
                    name: "value".to_string(),
                    ty: "uint256".to_string(),
                    indexed: false,
                    components: vec![],
                    internal_type: None,
                },
            ],
            anonymous: false,
        }
    }

    fn address_topic(addr: Address) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(addr.as_slice());
        B256::from(bytes)
    }

    fn build_normalized_log(event_abi: &EventAbi, from: Address, to: Address, value: U256) -> NormalizedLog {
        let topic0 = event_abi.selector();
        let data = alloy::primitives::U256::to_be_bytes::<32>(&value).to_vec();
        NormalizedLog {
            address: Address::repeat_byte(0x11),
            topics: vec![topic0, address_topic(from), address_topic(to)],
            data: Bytes::from(data),
            block_number: 10,
            transaction_index: Some(0),
            log_index: 0,
            transaction_hash: Default::default(),
            removed: None,
        }
    }

    #[test]
    fn dispatches_via_topic0() {
        let event_abi = transfer_event_abi();
        let from = Address::repeat_byte(0xAA);
        let to = Address::repeat_byte(0xBB);
        let log = build_normalized_log(&event_abi, from, to, U256::from(100u64));

        let mut topic_map = HashMap::new();
        topic_map.insert(event_abi.selector(), event_abi.clone());

        let decoded = decode_log(&log, &topic_map, &[]);
        assert_eq!(decoded.event_name, "Transfer");
        assert_eq!(decoded.args.get("value").unwrap().as_u64(), Some(100));
        assert!(decoded.indexed_args.contains("from"));
        assert!(decoded.indexed_args.contains("to"));
        assert!(decoded.args.contains("from"));
        assert!(decoded.args.contains("to"));
    }

    #[test]
    fn falls_back_to_unknown_with_no_match() {
        let log = NormalizedLog {
            address: Address::repeat_byte(0x11),
            topics: vec![keccak256("SomethingElse()")],
            data: Bytes::new(),
            block_number: 1,
            transaction_index: None,
            log_index: 0,
            transaction_hash: Default::default(),
            removed: None,
        };

        let decoded = decode_log(&log, &HashMap::new(), &[]);
        assert_eq!(decoded.event_name, "Unknown");
        assert!(decoded.args.0.is_empty());
    }

    #[test]
    fn preserves_declaration_order_when_indexed_and_body_interleave() {
        let event_abi = EventAbi {
            name: "Transfer".to_string(),
            inputs: vec![
                EventParam {
                    name: "from".to_string(),
                    ty: "address".to_string(),
                    indexed: true,
                    components: vec![],
                    internal_type: None,
                },
                EventParam {
                    name: "value".to_string(),
                    ty: "uint256".to_string(),
                    indexed: false,
                    components: vec![],
                    internal_type: None,
                },
                EventParam {
                    name: "to".to_string(),
                    ty: "address".to_string(),
                    indexed: true,
                    components: vec![],
                    internal_type: None,
                },
            ],
            anonymous: false,
        };

        let from = Address::repeat_byte(0xAA);
        let to = Address::repeat_byte(0xBB);
        let topic0 = event_abi.selector();
        let data = U256::to_be_bytes::<32>(&U256::from(100u64)).to_vec();
        let log = NormalizedLog {
            address: Address::repeat_byte(0x11),
            topics: vec![topic0, address_topic(from), address_topic(to)],
            data: Bytes::from(data),
            block_number: 10,
            transaction_index: Some(0),
            log_index: 0,
            transaction_hash: Default::default(),
            removed: None,
        };

        let decoded = decode_against(&log, &event_abi).unwrap();
        let names: Vec<&str> = decoded.args.0.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["from", "value", "to"]);
    }

    #[test]
    fn tries_fallback_candidates_when_no_topic0_entry() {
        let event_abi = transfer_event_abi();
        let from = Address::repeat_byte(0xAA);
        let to = Address::repeat_byte(0xBB);
        let log = build_normalized_log(&event_abi, from, to, U256::from(5u64));

        // No topic0 entry registered, only the fallback candidate list.
        let decoded = decode_log(&log, &HashMap::new(), std::slice::from_ref(&event_abi));
        assert_eq!(decoded.event_name, "Transfer");
    }
}
