#![forbid(unsafe_code)]

mod config;
mod error;

pub use config::CacheConfig;
pub use error::*;

use std::time::Duration;

/// Delimitador entre segmentos de uma chave de cache.
pub const KEY_DELIMITER: char = ':';

pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000); // 5 min
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(60_000); // 1 min

// TTLs por volatilidade dos dados
pub const LIST_TTL: Duration = Duration::from_millis(60_000); // 1 min
pub const CUSTOMER_LIST_TTL: Duration = Duration::from_millis(120_000); // 2 min
pub const REPORT_TTL: Duration = Duration::from_millis(600_000); // 10 min

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
