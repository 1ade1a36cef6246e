//! Message — what a subscriber receives when a topic it follows is published.

use serde::Serialize;

use crate::topic::Topic;
use crate::value::Value;

/// A published `(topic, value)` pair delivered to a mailbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub topic: Topic,
    pub value: Value,
}

impl Message {
    #[must_use]
    pub fn new(topic: Topic, value: Value) -> Self {
        Self { topic, value }
    }
}
