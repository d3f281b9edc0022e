pub(crate) mod fold;
mod reconstructor;

pub use reconstructor::*;
