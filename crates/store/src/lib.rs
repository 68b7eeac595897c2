#![forbid(unsafe_code)]

mod backend;
mod entry;
mod stats;
mod store;

pub use backend::CacheBackend;
pub use entry::Entry;
pub use stats::CacheStats;
pub use store::TtlStore;
