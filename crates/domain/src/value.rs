//! Typed values held by the stores.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::topic::Topic;

/// A single tagged value.
///
/// Producers publish scalars under leaf topics; a [`Map`](Self::Map) is
/// decomposed into leaf topics with [`Value::flatten`] before publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Boolean reading of the value, lenient like a config loader.
    ///
    /// Strings `true`, `t`, `1` and `on` (any casing) read as `true`,
    /// numbers read as `true` when non-zero, everything else is `false`.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "t" | "1" | "on"
            ),
            Self::Map(_) => false,
        }
    }

    /// Numeric reading of the value; strings are parsed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse().ok(),
            Self::Bool(_) | Self::Map(_) => None,
        }
    }

    /// Borrow the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Decompose into `(leaf topic, scalar)` pairs under `prefix`.
    ///
    /// A scalar yields itself under `prefix`; nested maps recurse with
    /// dotted keys.
    #[must_use]
    pub fn flatten(self, prefix: &Topic) -> Vec<(Topic, Value)> {
        let mut out = Vec::new();
        self.flatten_into(prefix, &mut out);
        out
    }

    fn flatten_into(self, prefix: &Topic, out: &mut Vec<(Topic, Value)>) {
        match self {
            Self::Map(map) => {
                for (key, value) in map {
                    value.flatten_into(&prefix.child(&key), out);
                }
            }
            scalar => out.push((prefix.clone(), scalar)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Map(map) => {
                f.write_str("{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// A JSON shape that has no [`Value`] counterpart (`null`, arrays).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported JSON value: {0}")]
pub struct UnsupportedJson(pub String);

impl TryFrom<serde_json::Value> for Value {
    type Error = UnsupportedJson;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| UnsupportedJson(n.to_string())),
            },
            serde_json::Value::String(s) => Ok(Self::String(s)),
            serde_json::Value::Object(obj) => obj
                .into_iter()
                .map(|(k, v)| Self::try_from(v).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Self::Map),
            other @ (serde_json::Value::Null | serde_json::Value::Array(_)) => {
                Err(UnsupportedJson(other.to_string()))
            }
        }
    }
}
