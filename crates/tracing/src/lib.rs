//! Tracing subscriber setup shared by every binary: stdout, optional
//! rotating file, and optional journald layers, assembled from CLI flags.
// Mostly taken from [reth](https://github.com/paradigmxyz/reth)

mod layer;
mod tracer;

pub use layer::*;
pub use tracer::*;
pub use tracing_subscriber;
