//! Topic — the case-insensitive dotted key under which a store keeps one value.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Subscription key that matches every topic of a store.
pub const WILDCARD: &str = "*";

/// A normalised (lowercase, trimmed) topic such as `gps.lat` or `components.usb_hub`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Normalise a raw key into a topic.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// The wildcard topic, used only as a subscription key.
    #[must_use]
    pub fn wildcard() -> Self {
        Self(WILDCARD.to_string())
    }

    /// Whether this is the `*` subscription key.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0 == WILDCARD
    }

    /// Whether the topic is empty after normalisation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the normalised key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a dotted segment: `gps` + `lat` → `gps.lat`.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self::new(segment)
        } else {
            Self::new(format!("{}.{segment}", self.0))
        }
    }

    /// Topic holding the operator override of the named component.
    #[must_use]
    pub fn component_override(name: &str) -> Self {
        Self::new(format!("components.{name}"))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Topic {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&String> for Topic {
    fn from(raw: &String) -> Self {
        Self::new(raw)
    }
}

impl From<&Topic> for Topic {
    fn from(topic: &Topic) -> Self {
        topic.clone()
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
