//! Command sink port — delivery of line commands to hardware.

use std::future::Future;

use carhub_domain::error::CarHubError;

/// Delivers a command token (e.g. `powerOn:usb_hub`) to the hardware that
/// executes it, returning once delivery is confirmed.
pub trait CommandSink: Send + Sync {
    /// Send one command.
    fn send(&self, command: &str) -> impl Future<Output = Result<(), CarHubError>> + Send;
}

impl<T: CommandSink> CommandSink for std::sync::Arc<T> {
    fn send(&self, command: &str) -> impl Future<Output = Result<(), CarHubError>> + Send {
        (**self).send(command)
    }
}
