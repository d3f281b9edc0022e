use std::collections::HashMap;

use alloy::primitives::Address;
use alloy_json_abi::Event;
use indexer_common::ConfigError;
use indexer_config::{AbiSource, Configuration, ContractEntry};
use sha2::{Digest, Sha256};
use tracing::warn;
use walkdir::WalkDir;

use crate::LoadedContract;

/// The set of contracts the indexer watches, with their resolved event ABIs.
///
/// Loaded once at startup (§4.1) and immutable thereafter — decode dispatch
/// only ever reads from it.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    by_name: HashMap<String, LoadedContract>,
    by_address: HashMap<Address, String>,
}

impl ContractRegistry {
    /// Loads every contract named in `config.contracts`, resolving each
    /// one's ABI by the precedence in §4.1: inline array, explicit path,
    /// then a recursive search of `config.abi_dir`.
    pub fn load(config: &Configuration) -> Result<Self, ConfigError> {
        let mut registry = ContractRegistry::default();

        for (name, entry) in &config.contracts {
            let address = parse_address(name, entry.address())?;
            let raw_events = resolve_abi(name, entry, config.abi_dir.as_deref())?;

            let (events, abi_hash) = match raw_events {
                Some(raw_events) => {
                    let abi_hash = hash_abi(&raw_events);
                    let events = raw_events
                        .into_iter()
                        .filter_map(|value| match serde_json::from_value::<Event>(value.clone()) {
                            Ok(event) => Some(event),
                            Err(_) => None,
                        })
                        .collect::<Vec<_>>();
                    (events, Some(abi_hash))
                }
                None => (Vec::new(), None),
            };

            let topic_to_event = events
                .iter()
                .filter(|event| !event.anonymous)
                .map(|event| (event.selector(), event.clone()))
                .collect();

            registry.by_address.insert(address, name.clone());
            registry.by_name.insert(
                name.clone(),
                LoadedContract {
                    name: name.clone(),
                    address,
                    topic_to_event,
                    events,
                    abi_hash,
                },
            );
        }

        Ok(registry)
    }

    /// Looks up a contract by its configured address.
    pub fn by_address(&self, address: &Address) -> Option<&LoadedContract> {
        self.by_address
            .get(address)
            .and_then(|name| self.by_name.get(name))
    }

    /// Looks up a contract by its configured name, case-insensitively.
    pub fn by_name(&self, name: &str) -> Option<&LoadedContract> {
        self.by_name.get(name).or_else(|| {
            self.by_name
                .values()
                .find(|c| c.name.eq_ignore_ascii_case(name))
        })
    }

    /// All addresses this registry watches, for `eth_subscribe`/`eth_getLogs`
    /// address filters.
    pub fn addresses(&self) -> Vec<Address> {
        self.by_name.values().map(|c| c.address).collect()
    }

    /// Iterates every loaded contract.
    pub fn contracts(&self) -> impl Iterator<Item = &LoadedContract> {
        self.by_name.values()
    }
}

fn parse_address(name: &str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse().map_err(|_| ConfigError::MissingAddress {
        name: name.to_string(),
    })
}

/// Returns the raw ABI JSON array for a contract, or `None` when an
/// `abi_dir` search finds nothing (a warning, not a fatal error).
fn resolve_abi(
    name: &str,
    entry: &ContractEntry,
    abi_dir: Option<&str>,
) -> Result<Option<Vec<serde_json::Value>>, ConfigError> {
    match entry.abi() {
        Some(AbiSource::Inline(items)) => Ok(Some(items.clone())),
        Some(AbiSource::Path(path)) => {
            let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
                path: path.clone(),
                source: Box::new(e),
            })?;
            let value: serde_json::Value =
                serde_json::from_str(&contents).map_err(|e| ConfigError::Load {
                    path: path.clone(),
                    source: Box::new(e),
                })?;
            Ok(Some(extract_abi_array(value)))
        }
        None => Ok(search_abi_dir(name, abi_dir)),
    }
}

/// Unwraps either a raw ABI array or a `{"abi": [...]}` compiler-artifact
/// object into the plain array.
fn extract_abi_array(value: serde_json::Value) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("abi") {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Recursively searches `abi_dir` for `<name>.json` then `<name>.abi.json`.
/// A miss degrades to `None` with a warning, per §4.1 — that contract's
/// logs will simply decode as `"Unknown"`.
fn search_abi_dir(name: &str, abi_dir: Option<&str>) -> Option<Vec<serde_json::Value>> {
    let abi_dir = abi_dir?;

    for candidate in [format!("{name}.json"), format!("{name}.abi.json")] {
        for entry in WalkDir::new(abi_dir).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy() == candidate {
                match std::fs::read_to_string(entry.path())
                    .ok()
                    .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
                {
                    Some(value) => return Some(extract_abi_array(value)),
                    None => continue,
                }
            }
        }
    }

    warn!(contract = name, abi_dir, "no ABI file found for contract, events will decode as Unknown");
    None
}

/// `sha256(canonical_json(abi))`, used by the `contracts` catalog table to
/// detect when a contract's ABI changed between runs.
fn hash_abi(raw_events: &[serde_json::Value]) -> String {
    let canonical = serde_json::to_vec(raw_events).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use indexer_config::ContractEntry;

    use super::*;

    fn transfer_abi_json() -> serde_json::Value {
        serde_json::json!([{
            "type": "event",
            "name": "Transfer",
            "anonymous": false,
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]
        }])
    }

    fn base_config(contracts: HashMap<String, ContractEntry>) -> Configuration {
        Configuration {
            rpc_ws: None,
            rpc_http: None,
            db_path: "indexer.db".to_string(),
            abi_dir: None,
            start_block: 0,
            reconnect_delay: None,
            batch_size: None,
            health_check_interval: None,
            health_check_threshold: None,
            contracts,
        }
    }

    #[test]
    fn loads_inline_abi_and_builds_topic_map() {
        let mut contracts = HashMap::new();
        contracts.insert(
            "Token".to_string(),
            ContractEntry::Detailed {
                address: "0x1111111111111111111111111111111111111111".to_string(),
                deployed_block: None,
                abi: Some(AbiSource::Inline(
                    transfer_abi_json().as_array().unwrap().clone(),
                )),
            },
        );

        let registry = ContractRegistry::load(&base_config(contracts)).unwrap();
        let contract = registry.by_name("Token").unwrap();
        assert_eq!(contract.events.len(), 1);
        assert_eq!(contract.topic_to_event.len(), 1);
        assert!(contract.abi_hash.is_some());
    }

    #[test]
    fn missing_abi_dir_entry_degrades_to_empty_not_error() {
        let mut contracts = HashMap::new();
        contracts.insert(
            "Unknown".to_string(),
            ContractEntry::Address("0x2222222222222222222222222222222222222222".to_string()),
        );

        let registry = ContractRegistry::load(&base_config(contracts)).unwrap();
        let contract = registry.by_name("Unknown").unwrap();
        assert!(contract.events.is_empty());
        assert!(contract.abi_hash.is_none());
    }

    #[test]
    fn finds_abi_in_directory_by_filename() {
        let dir = tempdir::TempDir::new("indexer-registry-test").unwrap();
        let abi_path = dir.path().join("Token.json");
        std::fs::write(&abi_path, transfer_abi_json().to_string()).unwrap();

        let mut contracts = HashMap::new();
        contracts.insert(
            "Token".to_string(),
            ContractEntry::Address("0x3333333333333333333333333333333333333333".to_string()),
        );

        let mut config = base_config(contracts);
        config.abi_dir = Some(dir.path().to_string_lossy().to_string());

        let registry = ContractRegistry::load(&config).unwrap();
        let contract = registry.by_name("Token").unwrap();
        assert_eq!(contract.events.len(), 1);
    }
}
