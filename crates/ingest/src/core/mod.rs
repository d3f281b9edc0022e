mod backfill;
mod health;
mod live;
mod supervisor;

pub use backfill::*;
pub use health::*;
pub use live::*;
pub use supervisor::*;
