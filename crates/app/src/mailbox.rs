//! Mailboxes — single-slot channels delivering store messages to one consumer.

use tokio::sync::mpsc;

use carhub_domain::message::Message;

/// Sending half registered with a store via `subscribe`.
pub type Mailbox = mpsc::Sender<Message>;

/// Receiving half owned by the consumer task.
pub type Inbox = mpsc::Receiver<Message>;

/// Capacity of every mailbox. A slow consumer holds at most one pending update.
pub const MAILBOX_CAPACITY: usize = 1;

/// Create a new mailbox pair.
#[must_use]
pub fn mailbox() -> (Mailbox, Inbox) {
    mpsc::channel(MAILBOX_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carhub_domain::topic::Topic;
    use carhub_domain::value::Value;

    #[tokio::test]
    async fn should_hold_a_single_pending_message() {
        let (tx, mut rx) = mailbox();
        tx.try_send(Message::new(Topic::new("a"), Value::Bool(true)))
            .unwrap();
        assert!(
            tx.try_send(Message::new(Topic::new("b"), Value::Bool(true)))
                .is_err()
        );
        assert_eq!(rx.recv().await.unwrap().topic, Topic::new("a"));
    }
}
