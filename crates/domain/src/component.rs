//! Component vocabulary — power states and operator overrides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Binary power state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Operator override stored in Settings under `components.<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    /// Force the component on.
    On,
    /// Force the component off.
    Off,
    /// Let the component's predicate decide.
    #[default]
    Auto,
}

/// An override string that is none of `on`, `off`, `auto`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized override {0:?}, expected on, off or auto")]
pub struct UnknownOverride(pub String);

impl FromStr for Override {
    type Err = UnknownOverride;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "auto" => Ok(Self::Auto),
            _ => Err(UnknownOverride(s.to_string())),
        }
    }
}

impl Override {
    /// Read an override from a stored setting.
    ///
    /// An absent setting is [`Override::Auto`].
    ///
    /// # Errors
    ///
    /// Returns [`UnknownOverride`] when the setting is present but not a
    /// recognised override; callers fall back to `Auto`.
    pub fn from_setting(value: Option<&Value>) -> Result<Self, UnknownOverride> {
        match value {
            None => Ok(Self::Auto),
            Some(Value::String(s)) => s.parse(),
            Some(other) => Err(UnknownOverride(other.to_string())),
        }
    }

    /// The forced state, or `None` for `Auto`.
    #[must_use]
    pub fn forced(self) -> Option<PowerState> {
        match self {
            Self::On => Some(PowerState::On),
            Self::Off => Some(PowerState::Off),
            Self::Auto => None,
        }
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
            Self::Auto => f.write_str("AUTO"),
        }
    }
}
