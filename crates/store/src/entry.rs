use tokio::time::{Duration, Instant};

/// Entrada no store: valor + instante absoluto de expiração.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> Entry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
