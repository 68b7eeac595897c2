use std::time::Duration;

use crate::{DEFAULT_TTL, SWEEP_INTERVAL};

/// Parâmetros operacionais do store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL aplicado quando `set` não recebe um explícito.
    pub default_ttl: Duration,
    /// Intervalo entre varreduras de entradas expiradas.
    pub sweep_interval: Duration,
}

impl CacheConfig {
    pub fn new(default_ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            default_ttl,
            sweep_interval,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Constrói a partir de milissegundos (formato usado pelos flags da CLI).
    pub fn from_millis(default_ttl_ms: u64, sweep_interval_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(default_ttl_ms),
            Duration::from_millis(sweep_interval_ms),
        )
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, SWEEP_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.default_ttl, Duration::from_secs(300));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn builder_overrides() {
        let cfg = CacheConfig::default()
            .with_default_ttl(Duration::from_millis(50))
            .with_sweep_interval(Duration::from_millis(10));
        assert_eq!(cfg, CacheConfig::from_millis(50, 10));
    }
}
