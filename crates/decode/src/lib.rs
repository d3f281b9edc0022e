//! Topic-indexed ABI dispatch: turns a raw log plus the set of event ABIs
//! known for its address into a [`DecodedEvent`], never failing outright.

mod core;
mod interface;

pub use core::*;
pub use interface::*;
