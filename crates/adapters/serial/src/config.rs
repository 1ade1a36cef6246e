//! Serial integration configuration.

use std::time::Duration;

use serde::Deserialize;

/// One microcontroller attached over a serial line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Name used in logs.
    pub name: String,
    /// Path of the tty (e.g. `/dev/ttyACM0`).
    pub path: String,
    /// Line speed; the tty is expected to be configured for it already.
    #[serde(default = "default_baud")]
    pub baud: u32,
}

fn default_baud() -> u32 {
    115_200
}

/// Configuration for the serial integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Whether serial devices are opened at all.
    pub enabled: bool,
    /// Devices to open; commands are written to all of them.
    pub devices: Vec<DeviceConfig>,
    /// How long to wait for an echo before rewriting a command, in milliseconds.
    pub retry_interval_ms: u64,
    /// Give up after this many writes; unset means retry forever.
    pub max_attempts: Option<u32>,
    /// Delay before retrying a failed open, in seconds.
    pub open_retry_secs: u64,
    /// Delay before reopening a disconnected port, in seconds.
    pub reconnect_cooldown_secs: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            devices: Vec::new(),
            retry_interval_ms: 200,
            max_attempts: None,
            open_retry_secs: 2,
            reconnect_cooldown_secs: 10,
        }
    }
}

impl SerialConfig {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(self.retry_interval_ms),
            max_attempts: self.max_attempts,
        }
    }

    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            open_retry: Duration::from_secs(self.open_retry_secs),
            cooldown: Duration::from_secs(self.reconnect_cooldown_secs),
        }
    }
}

/// How an unacknowledged command is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Time to wait for the echo after each write.
    pub interval: Duration,
    /// Total writes before giving up; `None` retries indefinitely.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Whether `attempts` writes exhaust the policy.
    #[must_use]
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// How a device is (re)opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait after a failed open.
    pub open_retry: Duration,
    /// Wait after the port disconnected.
    pub cooldown: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            open_retry: Duration::from_secs(2),
            cooldown: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = SerialConfig::default();
        assert!(!config.enabled);
        assert!(config.devices.is_empty());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            enabled = true
            retry_interval_ms = 500
            max_attempts = 3

            [[devices]]
            name = "teensy"
            path = "/dev/ttyACM0"
            baud = 9600

            [[devices]]
            name = "nano"
            path = "/dev/ttyUSB0"
        "#;
        let config: SerialConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].baud, 9600);
        assert_eq!(config.devices[1].baud, 115_200);
        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                interval: Duration::from_millis(500),
                max_attempts: Some(3),
            }
        );
        assert_eq!(config.open_retry_secs, 2);
    }

    #[test]
    fn should_only_exhaust_capped_policy() {
        assert!(!RetryPolicy::default().exhausted(u32::MAX));
        let capped = RetryPolicy {
            max_attempts: Some(2),
            ..RetryPolicy::default()
        };
        assert!(!capped.exhausted(1));
        assert!(capped.exhausted(2));
    }
}
