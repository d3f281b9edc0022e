use serde::Serialize;

use crate::DecodedArgs;

/// The result of decoding a single log: either a matched event or the
/// `"Unknown"` fallback spec.md requires when no ABI matches.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedEvent {
    /// The matched event's name, or `"Unknown"`.
    pub event_name: String,
    /// All ABI inputs, indexed and non-indexed, in declaration order.
    pub args: DecodedArgs,
    /// Topic-0 of the matched ABI, or of the raw log if nothing matched.
    pub event_signature: Option<String>,
    /// The subset of `args` whose ABI input is flagged `indexed`.
    pub indexed_args: DecodedArgs,
}

impl DecodedEvent {
    /// Builds the `"Unknown"` fallback event for a log with no ABI match.
    pub fn unknown(event_signature: Option<String>) -> Self {
        Self {
            event_name: "Unknown".to_string(),
            args: DecodedArgs::default(),
            event_signature,
            indexed_args: DecodedArgs::default(),
        }
    }
}
