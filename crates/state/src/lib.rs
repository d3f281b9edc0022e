//! Deterministic state reconstruction: a left-fold over persisted events,
//! producing the same snapshot regardless of the order those events were
//! ingested in.

mod core;
mod interface;

pub use core::*;
pub use interface::*;
