use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Duration;
use tracing::{debug, warn};

use bookcache_common::StoreError;
use bookcache_keys::{CacheKey, InvalidationScope, KeyBuilder};
use bookcache_store::CacheBackend;

/// Payload armazenado pelo cache-aside: qualquer resultado serializável.
pub type CachedValue = Arc<Value>;

/// Cache-aside sobre um [`CacheBackend`]: consulta, calcula no miss, grava.
///
/// O cache é apenas um acelerador. Falhas do backend, de chave ou de
/// (de)serialização são logadas e o resultado segue pelo caminho autoritativo.
/// Erros do cálculo voltam inalterados e nunca são gravados.
///
/// Dois misses concorrentes para a mesma chave calculam duas vezes; vence o
/// último `set`.
#[derive(Debug, Clone)]
pub struct CacheAside<B> {
    backend: B,
}

impl<B> CacheAside<B>
where
    B: CacheBackend<Value = CachedValue>,
{
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn fetch<T, E, F, Fut>(&self, key: KeyBuilder, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = match key.build() {
            Ok(key) => key,
            Err(e) => {
                warn!("chave de cache inválida, consultando sem cache: {e}");
                return compute().await;
            }
        };

        if let Some(hit) = self.lookup(&key) {
            debug!("cache hit: {key}");
            return Ok(hit);
        }

        let value = compute().await?;
        self.store(key, &value, ttl);
        Ok(value)
    }

    fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.backend.get(key.as_str()) {
            Ok(Some(cached)) => match T::deserialize(&*cached) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("entrada de cache ilegível em {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("falha ao ler cache em {key}: {e}");
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: CacheKey, value: &T, ttl: Duration) {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("resultado não serializável para {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.backend.set(key.to_string(), Arc::new(json), Some(ttl)) {
            warn!("falha ao gravar cache em {key}: {e}");
        }
    }

    pub fn invalidate(&self, scope: &InvalidationScope) -> Result<usize, StoreError> {
        self.backend.invalidate(scope)
    }

    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize, StoreError> {
        self.backend.delete_pattern(pattern)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.clear()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use bookcache_store::TtlStore;

    fn aside() -> CacheAside<TtlStore<CachedValue>> {
        CacheAside::new(TtlStore::with_defaults())
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = aside();
        let calls = AtomicUsize::new(0);
        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(vec![1, 2, 3])
        };

        let first = cache
            .fetch(KeyBuilder::new("m1", "ns").part(1u32), Duration::from_secs(60), compute)
            .await
            .unwrap();
        let second = cache
            .fetch(KeyBuilder::new("m1", "ns").part(1u32), Duration::from_secs(60), compute)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_is_not_cached() {
        let cache = aside();
        let calls = AtomicUsize::new(0);

        let err = cache
            .fetch(KeyBuilder::new("m1", "ns"), Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("db offline")
            })
            .await
            .unwrap_err();
        assert_eq!(err, "db offline");
        assert!(cache.backend().is_empty());

        let ok = cache
            .fetch(KeyBuilder::new("m1", "ns"), Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, &str>(5)
            })
            .await
            .unwrap();
        assert_eq!(ok, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_key_bypasses_cache() {
        let cache = aside();
        let value = cache
            .fetch(KeyBuilder::new("", "ns"), Duration::from_secs(60), || async {
                Ok::<_, ()>("direto".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "direto");
        assert!(cache.backend().is_empty());
    }

    #[tokio::test]
    async fn unreadable_entry_is_a_miss() {
        let cache = aside();
        cache
            .backend()
            .set("m1:ns", Arc::new(Value::String("não é número".into())));

        let value = cache
            .fetch(KeyBuilder::new("m1", "ns"), Duration::from_secs(60), || async {
                Ok::<u64, ()>(42)
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        // Sobrescrito com o valor recalculado
        assert_eq!(
            cache.backend().get("m1:ns").as_deref(),
            Some(&Value::from(42u64))
        );
    }
}
