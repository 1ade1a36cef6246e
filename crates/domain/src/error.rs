//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`CarHubError`] via `From` when crossing a port boundary.

/// Top-level error shared by port traits.
#[derive(Debug, thiserror::Error)]
pub enum CarHubError {
    /// A caller supplied input that violates a domain precondition.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// An adapter-level failure (database, serial port, broker, …).
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain precondition violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A topic was empty after normalisation.
    #[error("topic must not be empty")]
    EmptyTopic,

    /// A command sent to a device was empty.
    #[error("command must not be empty")]
    EmptyCommand,

    /// A component was created without a name.
    #[error("component name must not be empty")]
    EmptyComponentName,
}
