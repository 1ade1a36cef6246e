//! Serial adapter error types.

use carhub_domain::error::{CarHubError, ValidationError};

/// Errors specific to the serial adapter.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// A command with no content was submitted.
    #[error("empty message, not writing to serial")]
    EmptyMessage,

    /// The device's port is not open.
    #[error("serial port for device {device} not initialized")]
    NotInitialized {
        /// Device name.
        device: String,
    },

    /// No serial devices are configured to receive commands.
    #[error("no serial devices configured")]
    NoDevices,

    /// Opening, reading or writing the port failed.
    #[error("serial I/O error")]
    Io(#[from] std::io::Error),

    /// The device never echoed the command back.
    #[error("message {message:?} unconfirmed after {attempts} attempts")]
    Unconfirmed {
        /// The command that was written.
        message: String,
        /// Number of writes performed.
        attempts: u32,
    },
}

impl SerialError {
    /// Convert into a [`CarHubError`] for propagation across port boundaries.
    #[must_use]
    pub fn into_domain(self) -> CarHubError {
        match self {
            Self::EmptyMessage => ValidationError::EmptyCommand.into(),
            other => CarHubError::Storage(Box::new(other)),
        }
    }
}

impl From<SerialError> for CarHubError {
    fn from(err: SerialError) -> Self {
        err.into_domain()
    }
}
