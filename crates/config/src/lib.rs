//! Configuration loading: JSON file on disk, overlaid with environment
//! variables, validated into the shape the rest of the workspace consumes.

mod interface;

pub use interface::*;
