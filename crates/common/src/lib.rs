//! Shared primitives used by every other crate in the workspace: the
//! normalized log type, the cross-cutting error taxonomy, address/hex
//! helpers, and the block-timestamp cache.

mod interface;
mod utils;

pub use interface::*;
pub use utils::*;
