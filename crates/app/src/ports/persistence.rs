//! Persistence port — durable write-through for the Settings store.

use std::future::Future;

use carhub_domain::error::CarHubError;
use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

/// Durable backing storage for a store's current values.
pub trait Persistence: Send + Sync {
    /// Whether writes survive a restart.
    ///
    /// Non-durable stores apply the significance filter instead of
    /// persisting.
    fn is_durable(&self) -> bool {
        true
    }

    /// Load every persisted `(topic, value)` pair.
    fn load_all(&self) -> impl Future<Output = Result<Vec<(Topic, Value)>, CarHubError>> + Send;

    /// Persist the current value of one topic.
    fn save(
        &self,
        topic: &Topic,
        value: &Value,
    ) -> impl Future<Output = Result<(), CarHubError>> + Send;
}

impl<T: Persistence> Persistence for std::sync::Arc<T> {
    fn is_durable(&self) -> bool {
        (**self).is_durable()
    }

    fn load_all(&self) -> impl Future<Output = Result<Vec<(Topic, Value)>, CarHubError>> + Send {
        (**self).load_all()
    }

    fn save(
        &self,
        topic: &Topic,
        value: &Value,
    ) -> impl Future<Output = Result<(), CarHubError>> + Send {
        (**self).save(topic, value)
    }
}

/// Memory-only persistence used by the Session store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ephemeral;

impl Persistence for Ephemeral {
    fn is_durable(&self) -> bool {
        false
    }

    async fn load_all(&self) -> Result<Vec<(Topic, Value)>, CarHubError> {
        Ok(Vec::new())
    }

    async fn save(&self, _topic: &Topic, _value: &Value) -> Result<(), CarHubError> {
        Ok(())
    }
}
