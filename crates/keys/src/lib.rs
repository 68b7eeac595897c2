#![forbid(unsafe_code)]

mod key;
mod part;
mod scope;

pub use key::{CacheKey, KeyBuilder, TenantId, build_key};
pub use part::KeyPart;
pub use scope::InvalidationScope;
