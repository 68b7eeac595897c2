#![forbid(unsafe_code)]

mod aside;
pub mod model;
mod namespace;
mod reports;
mod source;

pub use aside::{CacheAside, CachedValue};
pub use model::*;
pub use namespace::{Mutation, Namespace};
pub use reports::ReportsCache;
pub use source::QuerySource;
