//! MQTT integration configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the MQTT mirror.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Whether the stores are mirrored at all.
    pub enabled: bool,
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Prefix of every published topic.
    pub base_topic: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// High-rate topics (e.g. `session/gps/speed`) only sent to a verbose broker.
    pub verbose_topics: Vec<String>,
    /// Whether this broker receives verbose topics.
    pub verbose: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "carhub".to_string(),
            username: None,
            password: None,
            base_topic: "vehicle".to_string(),
            keep_alive_secs: 30,
            verbose_topics: Vec::new(),
            verbose: false,
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }
}
