use tokio::time::Duration;

use bookcache_common::StoreError;
use bookcache_keys::InvalidationScope;

use crate::store::TtlStore;

/// Interface de um store de cache que pode falhar (ex.: cache em rede).
///
/// Falhas de leitura/escrita nunca devem impedir o cálculo do resultado: quem
/// consome um backend loga o erro e segue pelo caminho autoritativo.
pub trait CacheBackend: Send + Sync {
    type Value: Send + Sync;

    fn get(&self, key: &str) -> Result<Option<Self::Value>, StoreError>;

    /// `ttl = None` usa o TTL padrão do backend.
    fn set(&self, key: String, value: Self::Value, ttl: Option<Duration>) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    fn delete_pattern(&self, pattern: &str) -> Result<usize, StoreError>;

    fn invalidate(&self, scope: &InvalidationScope) -> Result<usize, StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

// O store in-memory nunca falha, exceto por padrão de regex inválido.
impl<V> CacheBackend for TtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Value = V;

    fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        Ok(TtlStore::get(self, key))
    }

    fn set(&self, key: String, value: V, ttl: Option<Duration>) -> Result<(), StoreError> {
        match ttl {
            Some(ttl) => self.set_with_ttl(key, value, ttl),
            None => TtlStore::set(self, key, value),
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(TtlStore::delete(self, key))
    }

    fn delete_pattern(&self, pattern: &str) -> Result<usize, StoreError> {
        TtlStore::delete_pattern(self, pattern)
    }

    fn invalidate(&self, scope: &InvalidationScope) -> Result<usize, StoreError> {
        Ok(TtlStore::invalidate(self, scope))
    }

    fn clear(&self) -> Result<(), StoreError> {
        TtlStore::clear(self);
        Ok(())
    }
}
