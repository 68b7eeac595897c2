use bookcache_common::{KEY_DELIMITER, KeyError};

use crate::key::validate_segment;
use crate::part::KeyPart;

/// Escopo de invalidação estruturado: tenant + namespace + sub-chave opcional.
///
/// Casa por prefixo de segmentos completos, então `m1:reports` nunca casa com
/// `m10:reports:...` nem com `m1:reports-v2:...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationScope {
    prefix: String,
}

impl InvalidationScope {
    pub fn new(tenant: impl AsRef<str>, namespace: impl AsRef<str>) -> Result<Self, KeyError> {
        let tenant = tenant.as_ref();
        let namespace = namespace.as_ref();
        validate_segment(tenant, KeyError::EmptyTenant)?;
        validate_segment(namespace, KeyError::EmptyNamespace)?;
        Ok(Self {
            prefix: format!("{tenant}{KEY_DELIMITER}{namespace}"),
        })
    }

    /// Restringe o escopo ao primeiro discriminador. Partes ausentes não mudam nada.
    pub fn with_sub_key(mut self, part: impl Into<KeyPart>) -> Self {
        if let Some(segment) = part.into().render() {
            self.prefix.push(KEY_DELIMITER);
            self.prefix.push_str(&segment);
        }
        self
    }

    /// Prefixo sem o delimitador final.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, key: &str) -> bool {
        match key.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(KEY_DELIMITER),
            None => false,
        }
    }

    /// Regex ancorada e escapada equivalente a [`matches`](Self::matches),
    /// para backends que só aceitam padrões.
    pub fn to_pattern(&self) -> String {
        format!("^{}(?:{KEY_DELIMITER}|$)", regex::escape(&self.prefix))
    }
}
