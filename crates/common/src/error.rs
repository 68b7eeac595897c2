/// Erros de construção de chaves de cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("tenant vazio")]
    EmptyTenant,
    #[error("namespace vazio")]
    EmptyNamespace,
    #[error("segmento contém o delimitador ':': {0}")]
    DelimiterInSegment(String),
    #[error("falha ao serializar discriminador: {0}")]
    Serialize(String),
}

/// Erros do store de cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("padrão inválido '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("backend indisponível: {0}")]
    Backend(String),
}

/// Erro top-level do bookcache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias.
pub type CacheResult<T> = Result<T, CacheError>;
