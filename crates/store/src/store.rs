use std::sync::{Arc, Weak};

use dashmap::DashMap;
use regex::Regex;
use tokio::sync::watch;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::debug;

use bookcache_common::{CacheConfig, StoreError};
use bookcache_keys::InvalidationScope;

use crate::entry::Entry;
use crate::stats::{CacheStats, Counters};

/// Estado compartilhado entre todos os handles do store.
struct SharedState<V> {
    data: DashMap<String, Entry<V>>,
    counters: Counters,
    config: CacheConfig,
}

impl<V> SharedState<V> {
    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.data.retain(|_, entry| {
            let keep = !entry.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        self.counters.expired(removed);
        removed
    }

    fn remove_where(&self, matches: impl Fn(&str) -> bool) -> usize {
        let mut removed = 0;
        self.data.retain(|key, _| {
            let keep = !matches(key.as_str());
            if !keep {
                removed += 1;
            }
            keep
        });
        self.counters.invalidated(removed);
        removed
    }
}

/// Sinal de parada do sweeper. Quando o último handle cai, o sender cai junto
/// e a task termina.
struct Sweeper {
    shutdown: watch::Sender<bool>,
}

/// Store chave-valor in-memory com TTL por entrada.
///
/// Leituras nunca retornam entradas expiradas: `get` confere a validade antes
/// de retornar e remove a entrada vencida. Uma task de background varre o mapa
/// a cada `sweep_interval` para remover chaves escritas e nunca mais lidas.
///
/// Deve ser criado dentro de um runtime tokio.
pub struct TtlStore<V> {
    shared: Arc<SharedState<V>>,
    sweeper: Arc<Sweeper>,
}

impl<V> Clone for TtlStore<V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            sweeper: self.sweeper.clone(),
        }
    }
}

impl<V> TtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        let shared = Arc::new(SharedState {
            data: DashMap::new(),
            counters: Counters::default(),
            config,
        });
        let (shutdown, shutdown_rx) = watch::channel(false);

        // Spawn background task para varrer entradas expiradas
        tokio::spawn(sweep_expired(
            Arc::downgrade(&shared),
            shutdown_rx,
            config.sweep_interval,
        ));

        Self {
            shared,
            sweeper: Arc::new(Sweeper { shutdown }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> CacheConfig {
        self.shared.config
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let lookup = self
            .shared
            .data
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => {
                self.shared.counters.hit();
                Some(value)
            }
            Some(None) => {
                // Só remove se continua expirada (pode ter sido re-setada)
                if self
                    .shared
                    .data
                    .remove_if(key, |_, entry| entry.is_expired())
                    .is_some()
                {
                    self.shared.counters.expired(1);
                    debug!("key expirada removida na leitura: {key}");
                }
                self.shared.counters.miss();
                None
            }
            None => {
                self.shared.counters.miss();
                None
            }
        }
    }

    /// Grava com o TTL padrão da configuração.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.shared.config.default_ttl);
    }

    /// Grava sobrescrevendo incondicionalmente qualquer entrada anterior.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.shared.data.insert(key.into(), Entry::new(value, ttl));
        self.shared.counters.set();
    }

    pub fn delete(&self, key: &str) -> bool {
        let removed = self.shared.data.remove(key).is_some();
        if removed {
            self.shared.counters.invalidated(1);
        }
        removed
    }

    /// Remove toda chave que casar com a regex em qualquer posição (sem âncora).
    ///
    /// Varredura O(n). Não é atômico em relação a `set` concorrentes.
    pub fn delete_pattern(&self, pattern: &str) -> Result<usize, StoreError> {
        let re = Regex::new(pattern).map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let removed = self.shared.remove_where(|key| re.is_match(key));
        debug!("delete_pattern '{pattern}': {removed} chaves removidas");
        Ok(removed)
    }

    /// Remove todas as chaves de um escopo tenant+namespace, por prefixo.
    pub fn invalidate(&self, scope: &InvalidationScope) -> usize {
        let removed = self.shared.remove_where(|key| scope.matches(key));
        debug!("invalidate '{}': {removed} chaves removidas", scope.prefix());
        removed
    }

    pub fn clear(&self) {
        let removed = self.shared.data.len();
        self.shared.data.clear();
        self.shared.counters.invalidated(removed);
    }

    /// Executa a varredura de expiradas imediatamente.
    pub fn purge_expired(&self) -> usize {
        self.shared.purge_expired()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.shared
            .data
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let entry = self.shared.data.get(key)?;
        (!entry.is_expired()).then(|| entry.remaining())
    }

    /// Número de entradas no mapa, incluindo expiradas ainda não varridas.
    pub fn len(&self) -> usize {
        self.shared.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.data.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.counters.snapshot(self.shared.data.len())
    }

    /// Cancela a varredura de background. Idempotente.
    pub fn stop(&self) {
        self.sweeper.shutdown.send_replace(true);
    }

    /// `false` depois que a task de varredura terminou.
    pub fn is_running(&self) -> bool {
        !self.sweeper.shutdown.is_closed()
    }
}

/// Background task que varre chaves expiradas.
async fn sweep_expired<V>(
    shared: Weak<SharedState<V>>,
    mut shutdown: watch::Receiver<bool>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // O primeiro tick é imediato
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            // Err = todos os handles caíram
            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    debug!("sweeper encerrado");
                    return;
                }
                continue;
            }
        }

        let Some(shared) = shared.upgrade() else {
            return;
        };
        let removed = shared.purge_expired();
        if removed > 0 {
            debug!("varredura removeu {removed} chaves expiradas");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TtlStore<String> {
        TtlStore::with_defaults()
    }

    async fn wait_stopped<V: Clone + Send + Sync + 'static>(store: &TtlStore<V>) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while store.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweeper deveria ter parado");
    }

    #[tokio::test]
    async fn get_set_basic() {
        let store = store();
        store.set("key", "value".to_string());
        assert_eq!(store.get("key"), Some("value".to_string()));
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let store = store();
        assert_eq!(store.get("missing"), None);
    }

    #[tokio::test]
    async fn set_with_expiry() {
        let store = store();
        store.set_with_ttl("key", "value".to_string(), Duration::from_millis(50));
        assert_eq!(store.get("key"), Some("value".to_string()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.get("key"), None);
        // Removida como efeito colateral da leitura
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().expired, 1);
    }

    #[tokio::test]
    async fn default_ttl_applies() {
        let store: TtlStore<u32> =
            TtlStore::new(CacheConfig::default().with_default_ttl(Duration::from_millis(30)));
        store.set("k", 1);
        assert_eq!(store.get("k"), Some(1));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("k"), None);
    }

    #[tokio::test]
    async fn overwrite_last_write_wins() {
        let store = store();
        store.set_with_ttl("key", "v1".to_string(), Duration::from_millis(10));
        store.set("key", "v2".to_string());
        tokio::time::sleep(Duration::from_millis(30)).await;
        // TTL de v1 não afeta v2
        assert_eq!(store.get("key"), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn delete_key() {
        let store = store();
        store.set("a", "1".to_string());
        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.get("a"), None);
    }

    #[tokio::test]
    async fn delete_pattern_scope() {
        let store = store();
        store.set("m1:reports:a", "v".to_string());
        store.set("m1:reports:b", "v".to_string());
        store.set("m2:reports:a", "v".to_string());

        let removed = store.delete_pattern("^m1:reports:").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.get("m1:reports:a"), None);
        assert_eq!(store.get("m1:reports:b"), None);
        assert_eq!(store.get("m2:reports:a"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn delete_pattern_is_unanchored() {
        let store = store();
        store.set("m1:revenue:x", "v".to_string());
        store.set("m2:booking-stats:x", "v".to_string());
        assert_eq!(store.delete_pattern("revenue").unwrap(), 1);
        assert!(store.contains_key("m2:booking-stats:x"));
    }

    #[tokio::test]
    async fn delete_pattern_invalid() {
        let store = store();
        store.set("a", "1".to_string());
        let err = store.delete_pattern("(unclosed").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPattern { .. }));
        // Nada removido
        assert!(store.contains_key("a"));
    }

    #[tokio::test]
    async fn invalidate_does_not_cross_tenants() {
        let store = store();
        store.set("m1:reports:a", "v".to_string());
        store.set("m10:reports:a", "v".to_string());
        store.set("m1:reports-v2:a", "v".to_string());

        let scope = InvalidationScope::new("m1", "reports").unwrap();
        assert_eq!(store.invalidate(&scope), 1);
        assert!(store.contains_key("m10:reports:a"));
        assert!(store.contains_key("m1:reports-v2:a"));
    }

    #[tokio::test]
    async fn clear_all() {
        let store = store();
        store.set("a", "1".to_string());
        store.set("b", "2".to_string());
        store.clear();
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn ttl_remaining() {
        let store = store();
        store.set_with_ttl("a", "1".to_string(), Duration::from_secs(10));
        let left = store.ttl_remaining("a").unwrap();
        assert!(left > Duration::from_secs(9) && left <= Duration::from_secs(10));
        assert_eq!(store.ttl_remaining("missing"), None);
    }

    #[tokio::test]
    async fn purge_expired_manual() {
        let store = store();
        store.set_with_ttl("old", "1".to_string(), Duration::ZERO);
        store.set("new", "2".to_string());
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn sweeper_removes_unread_keys() {
        let store: TtlStore<u32> =
            TtlStore::new(CacheConfig::from_millis(300_000, 20));
        store.set_with_ttl("never-read", 1, Duration::from_millis(10));
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        // Ninguém leu a chave, só a varredura pode tê-la removido
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().misses, 0);
    }

    #[tokio::test]
    async fn stop_ends_sweeper() {
        let store: TtlStore<u32> = TtlStore::new(CacheConfig::from_millis(300_000, 20));
        assert!(store.is_running());
        store.stop();
        store.stop();
        wait_stopped(&store).await;

        store.set_with_ttl("k", 1, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(60)).await;
        // Sem varredura a entrada fica até a próxima leitura
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k"), None);
    }

    #[tokio::test]
    async fn dropping_store_closes_shutdown_channel() {
        let store: TtlStore<u32> = TtlStore::new(CacheConfig::from_millis(300_000, 10));
        let rx_probe = store.sweeper.shutdown.subscribe();
        drop(store);
        tokio::time::timeout(Duration::from_secs(1), async {
            // Sender dropado → has_changed retorna Err
            while rx_probe.has_changed().is_ok() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn clones_share_state() {
        let a = store();
        let b = a.clone();
        a.set("k", "v".to_string());
        assert_eq!(b.get("k"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn concurrent_writers() {
        let store: TtlStore<usize> = TtlStore::with_defaults();
        let mut handles = Vec::new();
        for t in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..250 {
                    store.set(format!("t{t}:{i}"), i);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.len(), 1000);
        assert_eq!(store.stats().sets, 1000);
    }

    #[tokio::test]
    async fn stats_count_hits_and_misses() {
        let store = store();
        store.set("a", "1".to_string());
        store.get("a");
        store.get("a");
        store.get("b");
        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }
}
