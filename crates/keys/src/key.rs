use std::fmt;

use serde::Serialize;

use bookcache_common::{KEY_DELIMITER, KeyError};

use crate::part::KeyPart;

/// Identificador de tenant (merchant) já validado para uso como prefixo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self, KeyError> {
        let id = id.into();
        validate_segment(&id, KeyError::EmptyTenant)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chave de cache: `{tenant}:{namespace}:{parte}:{parte}...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn builder(tenant: impl AsRef<str>, namespace: impl AsRef<str>) -> KeyBuilder {
        KeyBuilder::new(tenant, namespace)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Monta uma chave a partir de tenant, namespace e discriminadores.
///
/// Discriminadores ausentes (`None`, `null`) são descartados antes da junção.
pub fn build_key<I, P>(
    tenant: impl AsRef<str>,
    namespace: impl AsRef<str>,
    parts: I,
) -> Result<CacheKey, KeyError>
where
    I: IntoIterator<Item = P>,
    P: Into<KeyPart>,
{
    parts
        .into_iter()
        .fold(KeyBuilder::new(tenant, namespace), |b, p| b.part(p))
        .build()
}

/// Builder incremental de [`CacheKey`].
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    tenant: String,
    namespace: String,
    parts: Vec<KeyPart>,
    // Primeiro erro de serialização, reportado em build()
    error: Option<KeyError>,
}

impl KeyBuilder {
    pub fn new(tenant: impl AsRef<str>, namespace: impl AsRef<str>) -> Self {
        Self {
            tenant: tenant.as_ref().to_string(),
            namespace: namespace.as_ref().to_string(),
            parts: Vec::new(),
            error: None,
        }
    }

    pub fn part(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    /// Adiciona um objeto serializável como JSON canônico.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match KeyPart::json(value) {
            Ok(part) => self.parts.push(part),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn build(self) -> Result<CacheKey, KeyError> {
        validate_segment(&self.tenant, KeyError::EmptyTenant)?;
        validate_segment(&self.namespace, KeyError::EmptyNamespace)?;
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut key = String::with_capacity(self.tenant.len() + self.namespace.len() + 16);
        key.push_str(&self.tenant);
        key.push(KEY_DELIMITER);
        key.push_str(&self.namespace);
        for segment in self.parts.iter().filter_map(KeyPart::render) {
            key.push(KEY_DELIMITER);
            key.push_str(&segment);
        }
        Ok(CacheKey(key))
    }
}

pub(crate) fn validate_segment(segment: &str, empty: KeyError) -> Result<(), KeyError> {
    if segment.is_empty() {
        return Err(empty);
    }
    // Tenant/namespace não podem conter ':', senão o prefixo de um tenant
    // poderia casar com chaves de outro.
    if segment.contains(KEY_DELIMITER) {
        return Err(KeyError::DelimiterInSegment(segment.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[derive(Serialize)]
    struct Filters {
        status: Option<&'static str>,
        staff_id: Option<&'static str>,
    }

    #[test]
    fn same_request_same_key() {
        let a = CacheKey::builder("m1", "bookings-list")
            .part(json!({"status": "PAID"}))
            .part(1u32)
            .part(20u32)
            .build()
            .unwrap();
        let b = CacheKey::builder("m1", "bookings-list")
            .part(json!({"status": "PAID"}))
            .part(1u32)
            .part(20u32)
            .build()
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), r#"m1:bookings-list:{"status":"PAID"}:1:20"#);
    }

    #[test]
    fn different_filters_different_keys() {
        let paid = build_key("m1", "bookings-list", [
            KeyPart::from(json!({"status": "PAID"})),
            1u32.into(),
            20u32.into(),
        ])
        .unwrap();
        let unpaid = build_key("m1", "bookings-list", [
            KeyPart::from(json!({"status": "UNPAID"})),
            1u32.into(),
            20u32.into(),
        ])
        .unwrap();
        assert_ne!(paid, unpaid);
    }

    #[test]
    fn absent_parts_are_dropped() {
        let with_gaps = build_key("m1", "ns", [KeyPart::Absent, "x".into(), KeyPart::Json(json!(null))])
            .unwrap();
        let plain = build_key("m1", "ns", ["x"]).unwrap();
        assert_eq!(with_gaps, plain);
        assert_eq!(plain.as_str(), "m1:ns:x");
    }

    #[test]
    fn option_parts() {
        let location: Option<&str> = None;
        let key = CacheKey::builder("m1", "revenue")
            .part(location)
            .part(Some("loc-1"))
            .build()
            .unwrap();
        assert_eq!(key.as_str(), "m1:revenue:loc-1");
    }

    #[test]
    fn no_parts() {
        let key = build_key("m1", "ns", Vec::<KeyPart>::new()).unwrap();
        assert_eq!(key.as_str(), "m1:ns");
    }

    #[test]
    fn dates_and_struct_filters() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let key = CacheKey::builder("m1", "revenue")
            .part(start)
            .json(&Filters {
                status: Some("PAID"),
                staff_id: None,
            })
            .build()
            .unwrap();
        assert_eq!(
            key.as_str(),
            r#"m1:revenue:2024-01-01T00:00:00.000Z:{"staff_id":null,"status":"PAID"}"#
        );
    }

    #[test]
    fn empty_segments_rejected() {
        assert_eq!(
            CacheKey::builder("", "ns").build(),
            Err(KeyError::EmptyTenant)
        );
        assert_eq!(
            CacheKey::builder("m1", "").build(),
            Err(KeyError::EmptyNamespace)
        );
    }

    #[test]
    fn delimiter_in_tenant_rejected() {
        assert!(matches!(
            CacheKey::builder("m1:evil", "ns").build(),
            Err(KeyError::DelimiterInSegment(_))
        ));
        assert!(TenantId::new("a:b").is_err());
    }

    #[test]
    fn discriminators_may_contain_delimiter() {
        let key = CacheKey::builder("m1", "ns").part("a:b").build().unwrap();
        assert_eq!(key.as_str(), "m1:ns:a:b");
    }

    #[test]
    fn number_and_string_collide() {
        // Colisão aceita: quem precisar distinguir deve prefixar o tipo
        let n = CacheKey::builder("m1", "ns").part(1i64).build().unwrap();
        let s = CacheKey::builder("m1", "ns").part("1").build().unwrap();
        assert_eq!(n, s);
    }

    #[test]
    fn tenant_id_as_prefix() {
        let tenant = TenantId::new("merchant-1").unwrap();
        let key = CacheKey::builder(&tenant, "ns").build().unwrap();
        assert_eq!(key.into_string(), "merchant-1:ns");
    }
}
