//! # carhub-adapter-mqtt
//!
//! MQTT adapter — mirrors both stores to a broker via rumqttc.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and keep the connection alive
//! - Subscribe to every topic of the Settings and Session stores
//! - Publish each update retained at QoS 2 under
//!   `<base_topic>/<settings|session>/<topic with dots as slashes>`
//! - Keep high-rate topics away from brokers not flagged `verbose`
//!
//! ## Dependency rule
//! Same as other adapters: depends on `carhub-app` and `carhub-domain`.

mod bridge;
mod config;
mod error;
pub mod format;

pub use bridge::{MqttBridge, Publisher, RumqttPublisher, connect};
pub use config::MqttConfig;
pub use error::MqttError;
