use std::{collections::HashMap, path::Path};

use indexer_common::ConfigError;
use serde::{Deserialize, Serialize};

const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
const DEFAULT_BATCH_SIZE: u64 = 1_000;
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;
const DEFAULT_HEALTH_CHECK_THRESHOLD: u32 = 3;

/// The indexer's full runtime configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Configuration {
    /// Websocket endpoint used for live log subscription.
    pub rpc_ws: Option<String>,
    /// HTTP endpoint used for backfill `eth_getLogs` calls and tip lookups.
    pub rpc_http: Option<String>,
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Directory recursively searched for `<ContractName>.json` ABI files
    /// when a contract entry doesn't name one explicitly.
    pub abi_dir: Option<String>,
    /// Block to start backfilling from when no cursor is persisted yet.
    pub start_block: u64,
    /// Base reconnect delay, in seconds, for the live subscriber's backoff.
    pub reconnect_delay: Option<u64>,
    /// Initial `eth_getLogs` window size, in blocks.
    pub batch_size: Option<u64>,
    /// Seconds between health-monitor tip-lag checks.
    pub health_check_interval: Option<u64>,
    /// Consecutive stale checks tolerated before the health monitor warns.
    pub health_check_threshold: Option<u32>,
    /// Contracts to index, keyed by a human-readable name.
    pub contracts: HashMap<String, ContractEntry>,
}

/// One configured contract. Accepts either a bare address string or a
/// detailed object, matching the two shapes users write by hand.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ContractEntry {
    /// `"MyToken": "0xabc..."`
    Address(String),
    /// `"MyToken": {"address": "0xabc...", "abi": [...] }`
    Detailed {
        /// The contract's on-chain address.
        address: String,
        /// The block the contract was deployed at, if known. Currently
        /// informational; backfill always starts from `start_block`.
        deployed_block: Option<u64>,
        /// Inline ABI or a path to one, taking precedence over `abi_dir`
        /// search.
        abi: Option<AbiSource>,
    },
}

impl ContractEntry {
    /// The contract's configured address, regardless of entry shape.
    pub fn address(&self) -> &str {
        match self {
            ContractEntry::Address(address) => address,
            ContractEntry::Detailed { address, .. } => address,
        }
    }

    /// The entry's explicit ABI source, if any.
    pub fn abi(&self) -> Option<&AbiSource> {
        match self {
            ContractEntry::Address(_) => None,
            ContractEntry::Detailed { abi, .. } => abi.as_ref(),
        }
    }
}

/// An ABI supplied directly in the config file, or a path to load it from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AbiSource {
    /// The raw ABI JSON array, embedded in the config.
    Inline(Vec<serde_json::Value>),
    /// A filesystem path to a `.json` ABI file.
    Path(String),
}

impl Configuration {
    /// Loads configuration from `path`, then overlays any environment
    /// variables matching a field name (env wins).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let file_config: Configuration =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Load {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

        let config = Self::overlay_env(file_config)?;
        config.validate()?;
        Ok(config)
    }

    fn overlay_env(file_config: Configuration) -> Result<Self, ConfigError> {
        #[derive(Deserialize, Default)]
        struct EnvOverrides {
            rpc_ws: Option<String>,
            rpc_http: Option<String>,
            db_path: Option<String>,
            abi_dir: Option<String>,
            start_block: Option<u64>,
            reconnect_delay: Option<u64>,
            batch_size: Option<u64>,
            health_check_interval: Option<u64>,
            health_check_threshold: Option<u32>,
        }

        let env: EnvOverrides = envy::from_env().map_err(|e| ConfigError::Load {
            path: "<environment>".to_string(),
            source: Box::new(e),
        })?;

        Ok(Configuration {
            rpc_ws: env.rpc_ws.or(file_config.rpc_ws),
            rpc_http: env.rpc_http.or(file_config.rpc_http),
            db_path: env.db_path.unwrap_or(file_config.db_path),
            abi_dir: env.abi_dir.or(file_config.abi_dir),
            start_block: env.start_block.unwrap_or(file_config.start_block),
            reconnect_delay: env.reconnect_delay.or(file_config.reconnect_delay),
            batch_size: env.batch_size.or(file_config.batch_size),
            health_check_interval: env
                .health_check_interval
                .or(file_config.health_check_interval),
            health_check_threshold: env
                .health_check_threshold
                .or(file_config.health_check_threshold),
            contracts: file_config.contracts,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.contracts.is_empty() {
            return Err(ConfigError::NoContracts);
        }

        for (name, entry) in &self.contracts {
            if entry.address().trim().is_empty() {
                return Err(ConfigError::MissingAddress {
                    name: name.clone(),
                });
            }
            if let Some(AbiSource::Path(path)) = entry.abi() {
                if !Path::new(path).exists() {
                    return Err(ConfigError::AbiPathNotFound {
                        name: name.clone(),
                        path: path.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Requires `rpc_ws` to be set, for commands that need live subscription.
    pub fn require_rpc_ws(&self) -> Result<&str, ConfigError> {
        self.rpc_ws
            .as_deref()
            .ok_or(ConfigError::MissingEndpoint {
                mode: "live subscription",
                endpoint: "rpc_ws",
            })
    }

    /// Requires `rpc_http` to be set, for commands that need backfill/tip
    /// lookups.
    pub fn require_rpc_http(&self) -> Result<&str, ConfigError> {
        self.rpc_http
            .as_deref()
            .ok_or(ConfigError::MissingEndpoint {
                mode: "backfill",
                endpoint: "rpc_http",
            })
    }

    /// Effective reconnect delay, in seconds, falling back to the default.
    pub fn reconnect_delay_secs(&self) -> u64 {
        self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY_SECS)
    }

    /// Effective `eth_getLogs` window size, falling back to the default.
    pub fn batch_size(&self) -> u64 {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Effective health-check interval, in seconds, falling back to the
    /// default.
    pub fn health_check_interval_secs(&self) -> u64 {
        self.health_check_interval
            .unwrap_or(DEFAULT_HEALTH_CHECK_INTERVAL_SECS)
    }

    /// Effective health-check threshold, falling back to the default.
    pub fn health_check_threshold(&self) -> u32 {
        self.health_check_threshold
            .unwrap_or(DEFAULT_HEALTH_CHECK_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(dir: &tempdir::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_bare_address_and_detailed_entries() {
        let dir = tempdir::TempDir::new("indexer-config-test").unwrap();
        let path = write_config(
            &dir,
            r#"{
                "rpc_ws": "wss://node.example/ws",
                "rpc_http": "https://node.example/http",
                "db_path": "indexer.db",
                "abi_dir": "abis",
                "start_block": 100,
                "contracts": {
                    "Simple": "0x1111111111111111111111111111111111111111",
                    "Detailed": {
                        "address": "0x2222222222222222222222222222222222222222",
                        "deployed_block": 42,
                        "abi": [{"type": "event"}]
                    }
                }
            }"#,
        );

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.contracts.len(), 2);
        assert_eq!(
            config.contracts["Simple"].address(),
            "0x1111111111111111111111111111111111111111"
        );
        assert!(matches!(
            config.contracts["Detailed"].abi(),
            Some(AbiSource::Inline(_))
        ));
        assert_eq!(config.batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn rejects_empty_contracts() {
        let dir = tempdir::TempDir::new("indexer-config-test").unwrap();
        let path = write_config(
            &dir,
            r#"{"db_path": "indexer.db", "start_block": 0, "contracts": {}}"#,
        );

        let err = Configuration::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NoContracts));
    }

    #[test]
    fn rejects_missing_abi_path() {
        let dir = tempdir::TempDir::new("indexer-config-test").unwrap();
        let path = write_config(
            &dir,
            r#"{
                "db_path": "indexer.db",
                "start_block": 0,
                "contracts": {
                    "Missing": {
                        "address": "0x1111111111111111111111111111111111111111",
                        "abi": "does/not/exist.json"
                    }
                }
            }"#,
        );

        let err = Configuration::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::AbiPathNotFound { .. }));
    }
}
