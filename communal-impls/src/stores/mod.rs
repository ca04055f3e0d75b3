mod memory_store;
mod pg_store;

pub use memory_store::*;
pub use pg_store::*;
