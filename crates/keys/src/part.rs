use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use bookcache_common::KeyError;

/// Discriminador de uma chave de cache, já na forma canônica.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
    /// Filtro opcional omitido. Descartado na montagem da chave.
    Absent,
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(Value),
}

impl KeyPart {
    /// Serializa um objeto de filtros para JSON canônico.
    ///
    /// Objetos viram `serde_json::Map`, que ordena as chaves, então a ordem de
    /// inserção dos campos nunca altera a chave resultante.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<KeyPart, KeyError> {
        serde_json::to_value(value)
            .map(KeyPart::Json)
            .map_err(|e| KeyError::Serialize(e.to_string()))
    }

    /// Forma textual do segmento, ou `None` se o segmento deve ser omitido.
    pub fn render(&self) -> Option<String> {
        match self {
            KeyPart::Absent | KeyPart::Json(Value::Null) => None,
            KeyPart::Text(s) => Some(s.clone()),
            KeyPart::Int(n) => Some(n.to_string()),
            KeyPart::UInt(n) => Some(n.to_string()),
            KeyPart::Float(f) => Some(f.to_string()),
            KeyPart::Bool(b) => Some(b.to_string()),
            // Mesmo formato de Date.toISOString(): milissegundos + 'Z'
            KeyPart::Timestamp(t) => Some(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            KeyPart::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            KeyPart::Json(Value::String(s)) => Some(s.clone()),
            KeyPart::Json(v) => Some(v.to_string()),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.render().is_none()
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Text(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Text(s)
    }
}

impl From<&String> for KeyPart {
    fn from(s: &String) -> Self {
        KeyPart::Text(s.clone())
    }
}

macro_rules! signed_part {
    ($($t:ty),*) => {
        $(impl From<$t> for KeyPart {
            fn from(n: $t) -> Self {
                KeyPart::Int(n as i64)
            }
        })*
    };
}

macro_rules! unsigned_part {
    ($($t:ty),*) => {
        $(impl From<$t> for KeyPart {
            fn from(n: $t) -> Self {
                KeyPart::UInt(n as u64)
            }
        })*
    };
}

signed_part!(i32, i64);
unsigned_part!(u32, u64, usize);

impl From<f64> for KeyPart {
    fn from(f: f64) -> Self {
        KeyPart::Float(f)
    }
}

impl From<bool> for KeyPart {
    fn from(b: bool) -> Self {
        KeyPart::Bool(b)
    }
}

impl From<DateTime<Utc>> for KeyPart {
    fn from(t: DateTime<Utc>) -> Self {
        KeyPart::Timestamp(t)
    }
}

impl From<NaiveDate> for KeyPart {
    fn from(d: NaiveDate) -> Self {
        KeyPart::Date(d)
    }
}

impl From<Value> for KeyPart {
    fn from(v: Value) -> Self {
        KeyPart::Json(v)
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(KeyPart::Absent)
    }
}
