//! Loads the set of watched contracts and their event ABIs once at startup,
//! resolving each one's ABI by inline config, explicit path, or directory
//! search.

mod core;
mod interface;

pub use core::*;
pub use interface::*;
