//! MQTT adapter error types.

use carhub_domain::error::CarHubError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[from] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a [`CarHubError::Storage`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> CarHubError {
        CarHubError::Storage(Box::new(self))
    }
}

impl From<MqttError> for CarHubError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
