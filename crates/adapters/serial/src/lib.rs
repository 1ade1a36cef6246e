//! # carhub-adapter-serial
//!
//! Serial adapter — talks to the microcontrollers wired into the car.
//!
//! ## How it works
//!
//! Each configured device is opened as a line-oriented byte stream and
//! kept open for the life of the process, reconnecting after failures.
//! Devices send two kinds of lines:
//!
//! | Line | Meaning |
//! |------|---------|
//! | JSON object | sensor readings, published to the Session store |
//! | anything else | the echo of a command we wrote |
//!
//! Commands are rewritten until their echo comes back (see [`device`]).
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `carhub-app` and `carhub-domain`.

mod config;
pub mod device;
mod error;
pub mod parser;
mod queue;
#[cfg(test)]
mod testing;

pub use config::{DeviceConfig, ReconnectPolicy, RetryPolicy, SerialConfig};
pub use device::{DeviceState, PortOpener, SerialDevice, TtyOpener};
pub use error::SerialError;

use std::sync::Arc;

use tokio::task::JoinHandle;

use carhub_app::event_store::SessionStore;
use carhub_app::ports::CommandSink;
use carhub_domain::error::CarHubError;

/// Every serial device of the car, addressed as one command sink.
#[derive(Clone, Default)]
pub struct SerialHub {
    devices: Vec<Arc<SerialDevice>>,
}

impl SerialHub {
    #[must_use]
    pub fn new(devices: Vec<Arc<SerialDevice>>) -> Self {
        Self { devices }
    }

    /// Build one device per configured entry, sharing the config's policies.
    #[must_use]
    pub fn from_config(config: &SerialConfig) -> Self {
        let retry = config.retry_policy();
        let reconnect = config.reconnect_policy();
        Self::new(
            config
                .devices
                .iter()
                .map(|device| Arc::new(SerialDevice::new(device.clone(), retry, reconnect)))
                .collect(),
        )
    }

    #[must_use]
    pub fn devices(&self) -> &[Arc<SerialDevice>] {
        &self.devices
    }

    /// Spawn the lifecycle loop of every device.
    pub fn start<O: PortOpener>(
        &self,
        opener: O,
        session: &Arc<SessionStore>,
    ) -> Vec<JoinHandle<()>> {
        let opener = Arc::new(opener);
        tracing::info!(devices = self.devices.len(), "starting serial devices");
        self.devices
            .iter()
            .map(|device| device.start(Arc::clone(&opener), Arc::clone(session)))
            .collect()
    }

    /// Write `message` to every device, one after the other, each waiting
    /// for its echo.
    ///
    /// A failing device does not stop delivery to the others.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::EmptyMessage`] or [`SerialError::NoDevices`]
    /// up front, otherwise the first per-device error.
    pub async fn broadcast(&self, message: &str) -> Result<(), SerialError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SerialError::EmptyMessage);
        }
        if self.devices.is_empty() {
            tracing::error!(message, "no serial devices configured to handle message");
            return Err(SerialError::NoDevices);
        }

        tracing::info!(message, devices = self.devices.len(), "writing to serial devices");
        let mut first_error = None;
        for device in &self.devices {
            if let Err(err) = device.write(message).await {
                tracing::error!(device = device.name(), error = %err, "failed to write to device");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl CommandSink for SerialHub {
    async fn send(&self, command: &str) -> Result<(), CarHubError> {
        Ok(self.broadcast(command).await?)
    }
}
