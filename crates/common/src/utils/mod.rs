/// Memoized block-number -> block-timestamp lookups.
mod block_time_cache;
/// Lower-case hex helpers for persistence keys.
mod hexutil;

pub use block_time_cache::*;
pub use hexutil::*;
