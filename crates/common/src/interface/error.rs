use thiserror::Error;

/// Fatal at startup: the indexer cannot run without a valid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `config.contracts` was empty.
    #[error("no contracts configured")]
    NoContracts,
    /// A contract entry was missing its address.
    #[error("missing address for contract '{name}'")]
    MissingAddress {
        /// The contract name from the config key.
        name: String,
    },
    /// An explicit ABI path was named but does not exist on disk.
    #[error("ABI path not found for contract '{name}': {path}")]
    AbiPathNotFound {
        /// The contract name from the config key.
        name: String,
        /// The path that was searched for.
        path: String,
    },
    /// A required endpoint (`rpc_http` or `rpc_ws`) was missing for the
    /// requested mode.
    #[error("{mode} requires `{endpoint}` to be set in the configuration")]
    MissingEndpoint {
        /// The mode that required the endpoint (e.g. "live subscription").
        mode: &'static str,
        /// The missing config key.
        endpoint: &'static str,
    },
    /// The configuration file could not be read or parsed.
    #[error("failed to load configuration from {path}")]
    Load {
        /// The path that was attempted.
        path: String,
        /// The underlying IO or JSON error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Recoverable in live mode: the subscription transport misbehaved.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The websocket connection dropped or never opened.
    #[error("transport connection failure: {0}")]
    Connection(String),
    /// A notification or response could not be parsed as JSON-RPC.
    #[error("failed to parse JSON-RPC message: {0}")]
    Parse(String),
    /// The node rejected the `eth_subscribe` call.
    #[error("subscribe rejected: {0}")]
    SubscribeRejected(String),
}

/// Recoverable by adaptation: a `getLogs` window was rejected for size.
#[derive(Debug, Error)]
pub enum RangeTooLargeError {
    /// The provider rejected the window and halving is still possible.
    #[error("log query range too large for window [{from}, {to}], shrinking batch size")]
    Shrinkable {
        /// Start of the rejected window.
        from: u64,
        /// End of the rejected window.
        to: u64,
    },
    /// The window was already a single block; no further halving is
    /// possible, so the error is fatal for this backfill call.
    #[error("log query range too large even at a single block: {block}")]
    Unrecoverable {
        /// The block whose single-block window was rejected.
        block: u64,
    },
}

/// Recoverable per-log: always swallowed at the decode boundary, downgrading
/// the event to `"Unknown"`. Kept as a type so the decoder's internal
/// control flow is explicit, even though callers never propagate it.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No ABI in the registry matched the log's topic-0 or any fallback
    /// candidate.
    #[error("no matching ABI for topic0 {topic0:?} on {address}")]
    NoMatch {
        /// The address that emitted the log.
        address: String,
        /// The log's topic-0, if present.
        topic0: Option<String>,
    },
    /// An ABI matched but argument decoding failed.
    #[error("failed to decode log against event '{event_name}': {reason}")]
    Mismatch {
        /// The event the log was matched against.
        event_name: String,
        /// The underlying decode failure.
        reason: String,
    },
}

/// Fatal for the batch, recoverable for the pipeline: the caller may retry
/// the same batch.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQL engine returned an error.
    #[error("store operation failed: {action}")]
    Backend {
        /// What the store was attempting to do.
        action: &'static str,
        /// The underlying sqlx error.
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Wraps a `sqlx::Error` with the action that was being attempted.
    pub fn backend(action: &'static str, source: sqlx::Error) -> Self {
        Self::Backend { action, source }
    }
}

/// Top-level error composing the taxonomy above, used at the supervisor
/// boundary where any component's failure needs a single propagation type.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// See [`RangeTooLargeError`].
    #[error(transparent)]
    RangeTooLarge(#[from] RangeTooLargeError),
    /// See [`StoreError`].
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A JSON-RPC call to the node failed outside the taxonomy above (e.g.
    /// fetching the chain tip or a block header).
    #[error("RPC call failed: {0}")]
    Rpc(String),
}
